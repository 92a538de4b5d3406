//! Target handle lifecycle across a whole run
//!
//! Kept to a single test: it counts this process's open descriptors, which
//! other tests running in parallel would disturb.

#![cfg(target_os = "linux")]

use seeklat::config::{RunConfig, ScanMode, SeedMode};
use seeklat::error::{exit_code_for, BenchError};
use seeklat::target::block::FixedSizer;
use std::io::Write;
use std::path::Path;

fn open_fds() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

fn config(target: &Path, buffer_size: usize) -> RunConfig {
    RunConfig {
        target: target.to_path_buf(),
        count: 200,
        workers: 2,
        direct: false,
        alignment: 4096,
        seed_mode: SeedMode::Reproducible,
        scan: Some(ScanMode::Full),
        buffer_size,
        latency_histogram: false,
        json_output: None,
        debug: false,
    }
}

#[test]
fn target_closed_after_failed_and_successful_runs() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0xa5; 1000]).unwrap();
    file.flush().unwrap();
    let sizer = FixedSizer::new(0);

    let before = open_fds();

    // 4096-byte reads cannot fit in a 1000-byte file
    let err = seeklat::run(&config(file.path(), 4096), &sizer).unwrap_err();
    assert!(matches!(err.downcast_ref::<BenchError>(), Some(BenchError::Read { .. })));
    assert_eq!(exit_code_for(&err), 1);
    assert_eq!(open_fds(), before);

    seeklat::run(&config(file.path(), 1), &sizer).unwrap();
    assert_eq!(open_fds(), before);
}
