//! Timing aggregation
//!
//! Collects one [`TimingSample`] per worker and derives the run [`Report`].
//! Two clocks are reported side by side: the sum of every worker's loop time
//! ("worker time") and the wall-clock time of the whole random-read phase
//! ("real time"). With more than one worker they diverge, and their ratio is
//! the parallel speedup.
//!
//! # Example
//!
//! ```
//! use seeklat::stats::{TimingSample, aggregator::StatisticsAggregator};
//! use std::time::Duration;
//!
//! let mut aggregator = StatisticsAggregator::new(4096);
//! aggregator.add_sample(TimingSample::new(0, 100, Duration::from_millis(50)));
//! aggregator.add_sample(TimingSample::new(1, 100, Duration::from_millis(70)));
//!
//! let report = aggregator.report(Duration::from_millis(72))?;
//! assert_eq!(report.total_requests, 200);
//! assert_eq!(report.worker_time, Duration::from_millis(120));
//! assert_eq!(report.bytes_read, 200 * 4096);
//! # Ok::<(), anyhow::Error>(())
//! ```

use super::histogram::{LatencyHistogram, LatencySummary};
use super::{serialize_nanos, TimingSample};
use crate::config::RunConfig;
use crate::util::time::{calculate_iops, calculate_throughput, per_request};
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Block sizes the request total is also expressed in
pub const REPORT_BLOCK_SIZES: [u64; 2] = [512, 4096];

/// Elapsed time of a single worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerTiming {
    pub worker: usize,
    pub requests: u64,
    #[serde(serialize_with = "serialize_nanos")]
    pub elapsed: Duration,
}

/// Summary of the random-read phase
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub workers: usize,
    pub total_requests: u64,
    /// Bytes per read
    pub read_len: usize,
    /// Sum of per-worker elapsed
    #[serde(serialize_with = "serialize_nanos")]
    pub worker_time: Duration,
    /// Wall clock of the whole phase
    #[serde(serialize_with = "serialize_nanos")]
    pub real_time: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub per_request_worker: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub per_request_real: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub fastest_worker: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub slowest_worker: Duration,
    pub bytes_read: u64,
    pub bytes_per_second: f64,
    pub iops: f64,
    pub latency: Option<LatencySummary>,
    pub per_worker: Vec<WorkerTiming>,
}

impl Report {
    /// Worker time over real time; 1.0 for a single worker
    pub fn speedup(&self) -> f64 {
        let real = self.real_time.as_secs_f64();
        if real > 0.0 {
            self.worker_time.as_secs_f64() / real
        } else {
            0.0
        }
    }

    /// Request total expressed as bytes of `block_size`-byte blocks
    pub fn requested_as_blocks(&self, block_size: u64) -> u64 {
        self.total_requests.saturating_mul(block_size)
    }
}

/// Per-worker sample collector
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    read_len: usize,
    samples: BTreeMap<usize, TimingSample>,
}

impl StatisticsAggregator {
    /// Aggregator for reads of `read_len` bytes
    pub fn new(read_len: usize) -> Self {
        Self {
            read_len,
            samples: BTreeMap::new(),
        }
    }

    /// Add a worker's sample, replacing any earlier one from the same worker
    pub fn add_sample(&mut self, sample: TimingSample) {
        self.samples.insert(sample.worker, sample);
    }

    /// Derive the report given the phase's wall-clock time
    pub fn report(&self, real_time: Duration) -> Result<Report> {
        let workers = self.samples.len();
        let total_requests: u64 = self.samples.values().map(|s| s.requests).sum();
        let worker_time: Duration = self.samples.values().map(|s| s.elapsed).sum();

        let fastest_worker = self.samples.values().map(|s| s.elapsed).min().unwrap_or_default();
        let slowest_worker = self.samples.values().map(|s| s.elapsed).max().unwrap_or_default();

        let bytes_read = total_requests.saturating_mul(self.read_len as u64);

        let latency = self.merged_latency()?.and_then(|h| h.summary());

        let per_worker = self
            .samples
            .values()
            .map(|s| WorkerTiming {
                worker: s.worker,
                requests: s.requests,
                elapsed: s.elapsed,
            })
            .collect();

        Ok(Report {
            workers,
            total_requests,
            read_len: self.read_len,
            worker_time,
            real_time,
            per_request_worker: per_request(worker_time, total_requests),
            per_request_real: per_request(real_time, total_requests),
            fastest_worker,
            slowest_worker,
            bytes_read,
            bytes_per_second: calculate_throughput(bytes_read, real_time),
            iops: calculate_iops(total_requests, real_time),
            latency,
            per_worker,
        })
    }

    fn merged_latency(&self) -> Result<Option<LatencyHistogram>> {
        let mut merged: Option<LatencyHistogram> = None;
        for hist in self.samples.values().filter_map(|s| s.latency.as_ref()) {
            match merged.as_mut() {
                Some(m) => m.merge(hist)?,
                None => merged = Some(hist.clone()),
            }
        }
        Ok(merged)
    }
}

/// Build the run report from all worker samples
pub fn aggregate(samples: Vec<TimingSample>, real_time: Duration, config: &RunConfig) -> Result<Report> {
    let mut aggregator = StatisticsAggregator::new(config.buffer_size);
    for sample in samples {
        aggregator.add_sample(sample);
    }
    aggregator.report(real_time)
}
