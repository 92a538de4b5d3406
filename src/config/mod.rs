//! Run configuration
//!
//! Everything a run needs is decided up front from the command line and frozen
//! in a [`RunConfig`]. There is no configuration file and nothing is read from
//! the environment.

pub mod cli;
pub mod cli_convert;
pub mod validator;

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Length of a time-boxed sequential scan
pub const QUICK_SCAN_LIMIT: Duration = Duration::from_secs(10);

/// Default number of reads per worker
pub const DEFAULT_COUNT: u64 = 100;

/// Read length for cached runs: only latency is measured, not data
pub const CACHED_READ_LEN: usize = 1;

/// Immutable parameters of one invocation
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    /// File or block device under test
    pub target: PathBuf,
    /// Reads issued by each worker
    pub count: u64,
    /// Number of concurrent workers
    pub workers: usize,
    /// Bypass the OS page cache
    pub direct: bool,
    /// Offset alignment applied when `direct` is set
    pub alignment: u64,
    /// Reproducible or true-random offsets
    pub seed_mode: SeedMode,
    /// Trailing sequential scan, if any
    pub scan: Option<ScanMode>,
    /// Bytes per random read
    pub buffer_size: usize,
    /// Time every read individually into a latency histogram
    pub latency_histogram: bool,
    /// Where to write the JSON report
    pub json_output: Option<PathBuf>,
    /// Debug-level logging
    pub debug: bool,
}

impl RunConfig {
    /// Offset alignment the workers must honour, 0 for none
    pub fn effective_alignment(&self) -> u64 {
        if self.direct {
            self.alignment
        } else {
            0
        }
    }
}

/// How worker random generators are seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// Seeds depend only on the worker index; runs replay the same offsets
    Reproducible,
    /// Seeds mix in process id and time
    TrueRandom,
}

/// Trailing sequential scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Read until end of input
    Full,
    /// Read until end of input or until the limit elapses
    TimeBoxed(Duration),
}

impl ScanMode {
    /// Wall-clock limit, `None` for a full scan
    pub fn limit(&self) -> Option<Duration> {
        match self {
            ScanMode::Full => None,
            ScanMode::TimeBoxed(limit) => Some(*limit),
        }
    }
}
