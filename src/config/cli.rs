//! CLI argument parsing using clap
//!
//! The flags keep their historical single-dash spelling (`-count 500`,
//! `-nocache`). Clap reads a single dash as a cluster of short flags, so
//! [`normalize_args`] rewrites known long names to the double-dash form first.
//! Both spellings are accepted.

use super::cli_convert::{parse_size, round_up};
use super::{RunConfig, ScanMode, SeedMode, CACHED_READ_LEN, DEFAULT_COUNT, QUICK_SCAN_LIMIT};
use crate::error::BenchError;
use crate::util::buffer::DIRECT_IO_BLOCK_SIZE;
use anyhow::Context;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Long flags that may be written with a single dash
const LONG_FLAGS: &[&str] = &[
    "count",
    "parallel",
    "nocache",
    "truerandom",
    "bs",
    "align",
    "hist",
    "json",
    "debug",
    "help",
    "version",
];

/// seeklat - storage latency micro-benchmark
///
/// Issues randomly positioned reads against a file or block device and reports
/// per-request latency, optionally followed by a sequential throughput scan.
#[derive(Parser, Debug)]
#[command(name = "seeklat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// File or block device to read from
    #[arg(value_name = "PATH")]
    pub target: Option<PathBuf>,

    /// How many reads to do (per worker)
    #[arg(long, default_value_t = DEFAULT_COUNT)]
    pub count: u64,

    /// Number of parallel workers
    #[arg(short = 'p', long = "parallel", default_value_t = 1)]
    pub parallel: usize,

    /// Bypass OS cache
    #[arg(long)]
    pub nocache: bool,

    /// Finish by a sequential complete file read
    #[arg(short = 'T')]
    pub full_scan: bool,

    /// Finish by a quick sequential file read (10s max)
    #[arg(short = 't')]
    pub quick_scan: bool,

    /// Seeks are not deterministic (repeatable) anymore
    #[arg(long)]
    pub truerandom: bool,

    /// Bytes per read (e.g., 512, 4k, 1M); default 1, or 4k with -nocache
    #[arg(long = "bs", value_name = "SIZE")]
    pub block_size: Option<String>,

    /// Offset alignment with -nocache (power of 2)
    #[arg(long, value_name = "SIZE", default_value = "4k")]
    pub align: String,

    /// Time each read and print latency percentiles
    #[arg(long)]
    pub hist: bool,

    /// Write a JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse the process arguments
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Parse an explicit argument list (first item is the program name)
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// Build the immutable run configuration
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::NoTarget`] without a path, or an error for
    /// malformed sizes.
    pub fn into_config(self) -> anyhow::Result<RunConfig> {
        let target = self.target.ok_or(BenchError::NoTarget)?;

        let alignment = parse_size(&self.align).context("Invalid alignment")?;

        let requested = match self.block_size {
            Some(ref bs) => Some(parse_size(bs).context("Invalid block size")?),
            None => None,
        };

        let buffer_size = if self.nocache {
            let len = requested.unwrap_or(DIRECT_IO_BLOCK_SIZE as u64);
            round_up(len, alignment)
        } else {
            requested.unwrap_or(CACHED_READ_LEN as u64)
        };
        let buffer_size = usize::try_from(buffer_size).context("Block size out of range")?;

        // -t bounds the scan even when -T is also given
        let scan = if self.quick_scan {
            Some(ScanMode::TimeBoxed(QUICK_SCAN_LIMIT))
        } else if self.full_scan {
            Some(ScanMode::Full)
        } else {
            None
        };

        Ok(RunConfig {
            target,
            count: self.count,
            workers: self.parallel,
            direct: self.nocache,
            alignment,
            seed_mode: if self.truerandom {
                SeedMode::TrueRandom
            } else {
                SeedMode::Reproducible
            },
            scan,
            buffer_size,
            latency_histogram: self.hist,
            json_output: self.json,
            debug: self.debug,
        })
    }
}

/// Rewrite `-name` / `-name=value` to `--name` / `--name=value` for known long flags
///
/// Arguments after a bare `--` are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;

    for (i, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if i == 0 || passthrough {
            out.push(arg);
            continue;
        }

        match arg.to_str() {
            Some("--") => {
                passthrough = true;
                out.push(arg);
            }
            Some(s) if s.starts_with('-') && !s.starts_with("--") => {
                let name = s[1..].split('=').next().unwrap_or_default();
                if LONG_FLAGS.contains(&name) {
                    out.push(OsString::from(format!("-{}", s)));
                } else {
                    out.push(arg);
                }
            }
            _ => out.push(arg),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_args(std::iter::once("seeklat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_normalize_single_dash_long_flags() {
        let args = normalize_args(["seeklat", "-count", "5", "-nocache", "-p", "2", "-count=7", "/dev/sda"]);
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            ["seeklat", "--count", "5", "--nocache", "-p", "2", "--count=7", "/dev/sda"]
        );
    }

    #[test]
    fn test_normalize_stops_at_terminator() {
        let args = normalize_args(["seeklat", "--", "-count"]);
        assert_eq!(args[2], OsString::from("-count"));
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["disk.img"]).into_config().unwrap();
        assert_eq!(config.target, PathBuf::from("disk.img"));
        assert_eq!(config.count, 100);
        assert_eq!(config.workers, 1);
        assert!(!config.direct);
        assert_eq!(config.seed_mode, SeedMode::Reproducible);
        assert_eq!(config.scan, None);
        assert_eq!(config.buffer_size, 1);
        assert_eq!(config.effective_alignment(), 0);
    }

    #[test]
    fn test_go_style_flags() {
        let config = parse(&["-count", "500", "-p", "4", "-nocache", "-truerandom", "-T", "/dev/sdb"])
            .into_config()
            .unwrap();
        assert_eq!(config.count, 500);
        assert_eq!(config.workers, 4);
        assert!(config.direct);
        assert_eq!(config.alignment, 4096);
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.seed_mode, SeedMode::TrueRandom);
        assert_eq!(config.scan, Some(ScanMode::Full));
    }

    #[test]
    fn test_quick_scan_wins() {
        let config = parse(&["-T", "-t", "f"]).into_config().unwrap();
        assert_eq!(config.scan, Some(ScanMode::TimeBoxed(QUICK_SCAN_LIMIT)));
    }

    #[test]
    fn test_block_size_rounded_to_alignment() {
        let config = parse(&["-nocache", "-bs", "5000", "-align", "512", "f"]).into_config().unwrap();
        assert_eq!(config.alignment, 512);
        assert_eq!(config.buffer_size, 5120);

        let config = parse(&["-bs", "5000", "f"]).into_config().unwrap();
        assert_eq!(config.buffer_size, 5000);
    }

    #[test]
    fn test_missing_target() {
        let err = parse(&["-count", "3"]).into_config().unwrap_err();
        assert!(matches!(err.downcast_ref::<BenchError>(), Some(BenchError::NoTarget)));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_args(["seeklat", "-bogus", "f"]).is_err());
    }
}
