//! Latency histogram using HdrHistogram
//!
//! Per-read latencies are only collected with `-hist`, since timing each read
//! adds two clock reads to the measured loop. Each worker fills its own
//! histogram; the aggregator merges them.
//!
//! # Example
//!
//! ```
//! use seeklat::stats::histogram::LatencyHistogram;
//! use std::time::Duration;
//!
//! let mut hist = LatencyHistogram::new()?;
//! hist.record(Duration::from_micros(100));
//! hist.record(Duration::from_micros(200));
//! assert_eq!(hist.len(), 2);
//! assert!(hist.percentile(50.0).is_some());
//! # Ok::<(), anyhow::Error>(())
//! ```

use super::serialize_nanos;
use crate::Result;
use anyhow::Context;
use hdrhistogram::Histogram;
use serde::Serialize;
use std::time::Duration;

/// Highest trackable value: one hour in nanoseconds
const MAX_TRACKABLE_NS: u64 = 3_600_000_000_000;

/// Latency histogram wrapper
///
/// Tracks 1ns to 1 hour with 3 significant digits (0.1% precision).
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    pub fn new() -> Result<Self> {
        let histogram = Histogram::new_with_bounds(1, MAX_TRACKABLE_NS, 3)
            .context("failed to create latency histogram")?;
        Ok(Self { histogram })
    }

    /// Record a latency sample, clamped to the trackable range
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(MAX_TRACKABLE_NS);
        let value = nanos.clamp(1, MAX_TRACKABLE_NS);
        // Cannot fail: value is within the bounds the histogram was built with
        let _ = self.histogram.record(value);
    }

    /// Add all samples of `other` into this histogram
    pub fn merge(&mut self, other: &LatencyHistogram) -> Result<()> {
        self.histogram
            .add(&other.histogram)
            .context("failed to merge latency histograms")
    }

    /// Latency at `percentile` (0.0 - 100.0), `None` when empty
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.value_at_percentile(percentile)))
    }

    pub fn min(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.min()))
    }

    pub fn max(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.max()))
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.mean() as u64))
    }

    /// Number of samples recorded
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }

    /// Snapshot of the usual percentiles, `None` when empty
    pub fn summary(&self) -> Option<LatencySummary> {
        Some(LatencySummary {
            samples: self.len(),
            min: self.min()?,
            mean: self.mean()?,
            p50: self.percentile(50.0)?,
            p90: self.percentile(90.0)?,
            p99: self.percentile(99.0)?,
            p999: self.percentile(99.9)?,
            max: self.max()?,
        })
    }
}

/// Per-read latency percentiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub samples: u64,
    #[serde(serialize_with = "serialize_nanos")]
    pub min: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub mean: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub p50: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub p90: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub p99: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub p999: Duration,
    #[serde(serialize_with = "serialize_nanos")]
    pub max: Duration,
}
