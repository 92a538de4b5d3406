//! Coordinator module
//!
//! Orchestrates one run: validates the config, opens the target, drives the
//! workers, aggregates and reports, then runs the optional sequential scan.
//! The target handle is closed on every exit path once it is open.

use crate::config::{validator::validate_config, RunConfig, ScanMode, SeedMode};
use crate::output::json::{write_json_output, JsonReport, JsonTarget};
use crate::output::text;
use crate::scan::{scan_sequential, ScanProgress};
use crate::stats::aggregator::aggregate;
use crate::target::{block::BlockDeviceSizer, OpenFlags, Target};
use crate::worker::run_workers;
use crate::Result;
use anyhow::Context;
use chrono::Utc;
use std::io::Write;
use tracing::{debug, info};

/// Run a complete benchmark against `config.target`
///
/// `sizer` answers the block device size query when metadata reports 0
/// bytes. The first error wins: a failed measurement is returned even if the
/// close that follows also fails.
pub fn run(config: &RunConfig, sizer: &dyn BlockDeviceSizer) -> Result<()> {
    validate_config(config).context("Configuration validation failed")?;
    debug!("{:?}", config);

    if config.direct {
        info!("nocache requested");
    }

    let flags = OpenFlags {
        direct: config.direct,
        alignment: config.effective_alignment(),
    };
    let target = Target::open(&config.target, flags, sizer)?;
    info!("file {} opened", target.path().display());

    let measured = measure(config, &target);
    let closed = target.close().context("failed to close target");
    settle(measured, closed)
}

fn settle(measured: Result<()>, closed: Result<()>) -> Result<()> {
    measured?;
    closed
}

fn measure(config: &RunConfig, target: &Target) -> Result<()> {
    info!("{}", text::size_line(target.size(), config.count));
    if config.seed_mode == SeedMode::TrueRandom {
        info!("seeding nonsense as requested.");
    }
    if config.workers > 1 {
        info!("running {} parallel workers", config.workers);
    }

    let started_at = Utc::now();
    let timings = run_workers(target.file(), config, target.size())?;
    let report = aggregate(timings.samples, timings.real_time, config)?;
    text::print_report(&report);

    let scan_report = match config.scan {
        Some(mode) => {
            match mode {
                ScanMode::Full => info!("doing a seq read ..."),
                ScanMode::TimeBoxed(_) => info!("doing a quick seq read ..."),
            }

            let mut file = target.file();
            let scan_report = scan_sequential(&mut file, mode, show_progress)?;
            text::print_scan(&scan_report);
            Some(scan_report)
        }
        None => None,
    };

    if let Some(ref path) = config.json_output {
        let doc = JsonReport::new(
            started_at,
            config,
            JsonTarget::from(target),
            &report,
            scan_report.as_ref(),
        );
        write_json_output(path, &doc)?;
        info!("JSON report written to {}", path.display());
    }

    Ok(())
}

/// A lost progress line does not affect the scan result
fn show_progress(progress: &ScanProgress) {
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = write!(stdout, "{}", text::progress_line(progress)).and_then(|_| stdout.flush()) {
        debug!("progress line not written: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::target::block::FixedSizer;
    use std::path::PathBuf;

    fn config(target: PathBuf) -> RunConfig {
        RunConfig {
            target,
            count: 50,
            workers: 2,
            direct: false,
            alignment: 4096,
            seed_mode: SeedMode::Reproducible,
            scan: None,
            buffer_size: 1,
            latency_histogram: false,
            json_output: None,
            debug: false,
        }
    }

    fn temp_target(len: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![7u8; len]).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_settle_measure_error_wins() {
        let err = settle(Err(anyhow::anyhow!("read failed")), Err(anyhow::anyhow!("close failed")))
            .unwrap_err();
        assert_eq!(err.to_string(), "read failed");
    }

    #[test]
    fn test_settle_close_error_surfaces() {
        let err = settle(Ok(()), Err(anyhow::anyhow!("close failed"))).unwrap_err();
        assert_eq!(err.to_string(), "close failed");
        assert!(settle(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn test_run_with_scan_and_json() {
        let file = temp_target(64 * 1024);
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("run.json");

        let mut config = config(file.path().to_path_buf());
        config.scan = Some(ScanMode::Full);
        config.json_output = Some(json_path.clone());

        run(&config, &FixedSizer::new(0)).unwrap();

        let text = std::fs::read_to_string(&json_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["random_reads"]["total_requests"], 100);
        assert_eq!(value["sequential_scan"]["bytes_read"], 64 * 1024);
    }

    #[test]
    fn test_run_read_past_end_fails() {
        let file = temp_target(1000);
        let mut config = config(file.path().to_path_buf());
        config.buffer_size = 4096;

        let err = run(&config, &FixedSizer::new(0)).unwrap_err();
        assert!(matches!(err.downcast_ref::<BenchError>(), Some(BenchError::Read { .. })));
    }

    #[test]
    fn test_run_rejects_invalid_config_before_open() {
        let sizer = FixedSizer::new(1 << 20);
        let mut config = config(PathBuf::from("/nonexistent/seeklat-target"));
        config.count = 0;

        assert!(run(&config, &sizer).is_err());
        assert_eq!(sizer.queries(), 0);
    }
}
