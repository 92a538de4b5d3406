//! Timing statistics
//!
//! Each worker hands back one [`TimingSample`] when it finishes: how long its
//! read loop took and, with `-hist`, a histogram of individual read latencies.
//! [`aggregator`] turns the samples of a run into a [`aggregator::Report`].

pub mod aggregator;
pub mod histogram;

use histogram::LatencyHistogram;
use serde::Serializer;
use std::time::Duration;

/// Result of one worker's read loop
#[derive(Debug, Clone)]
pub struct TimingSample {
    /// Worker index
    pub worker: usize,
    /// Reads completed
    pub requests: u64,
    /// Wall-clock time of the whole loop
    pub elapsed: Duration,
    /// Individual read latencies, if collected
    pub latency: Option<LatencyHistogram>,
}

impl TimingSample {
    pub fn new(worker: usize, requests: u64, elapsed: Duration) -> Self {
        Self {
            worker,
            requests,
            elapsed,
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: LatencyHistogram) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Serialize a [`Duration`] as integer nanoseconds
pub(crate) fn serialize_nanos<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
    serializer.serialize_u64(nanos)
}
