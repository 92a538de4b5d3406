//! seeklat - storage latency micro-benchmark
//!
//! Opens a file or block device, issues randomly positioned reads from one or
//! more workers, optionally bypassing the page cache, and reports aggregate
//! and per-request timings. A run can finish with a sequential scan of the
//! whole target to measure streaming throughput.
//!
//! # Architecture
//!
//! - **Target**: read-only handle, size resolved from metadata or the block
//!   device ([`target`])
//! - **Offsets**: reproducible or true-random uniform offsets, aligned under
//!   cache bypass ([`offset`], [`distribution`])
//! - **Read driver**: one scoped thread per worker doing positioned reads
//!   ([`worker`], [`engine`])
//! - **Statistics**: per-worker timings aggregated into a report ([`stats`],
//!   [`output`])
//! - **Sequential scan**: optional trailing throughput pass ([`scan`])
//! - **Coordinator**: one run from open to close ([`coordinator`])

pub mod config;
pub mod coordinator;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod offset;
pub mod output;
pub mod scan;
pub mod stats;
pub mod target;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::RunConfig;
pub use coordinator::run;
pub use error::BenchError;

/// Result type used throughout seeklat
pub type Result<T> = anyhow::Result<T>;
