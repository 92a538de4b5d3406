//! Sequential scan
//!
//! Optional last phase of a run: rewind the target and stream through it in
//! 128 KiB reads to measure sequential throughput. A full scan reads to the
//! end; a time-boxed scan also stops once its limit has elapsed.
//!
//! Progress is reported through a callback at most once per second, which
//! keeps the scan loop free of any output concerns.
//!
//! # Example
//!
//! ```
//! use seeklat::config::ScanMode;
//! use seeklat::scan::scan_sequential;
//! use std::io::Cursor;
//!
//! let mut data = Cursor::new(vec![0u8; 300 * 1024]);
//! let report = scan_sequential(&mut data, ScanMode::Full, |_| {})?;
//! assert_eq!(report.bytes_read, 300 * 1024);
//! assert!(report.reached_end);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::ScanMode;
use crate::stats::serialize_nanos;
use crate::util::buffer::{AlignedBuffer, DIRECT_IO_BLOCK_SIZE};
use crate::util::time::calculate_throughput;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::time::{Duration, Instant};
use tracing::debug;

/// Bytes per sequential read
pub const SCAN_CHUNK: usize = 128 * 1024;

/// Minimum time between two progress callbacks
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Progress since the previous callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    /// Bytes read since the previous callback
    pub interval_bytes: u64,
    /// Bytes read since the scan started
    pub total_bytes: u64,
}

/// Outcome of a sequential scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub mode: ScanMode,
    pub bytes_read: u64,
    #[serde(serialize_with = "serialize_nanos")]
    pub elapsed: Duration,
    pub bytes_per_second: f64,
    /// False when a time-boxed scan stopped before end of input
    pub reached_end: bool,
}

/// Rewind `reader` and read it sequentially
///
/// `progress` is called at most once per [`PROGRESS_INTERVAL`].
///
/// # Errors
///
/// Any seek or read error. End of input ends the scan normally and
/// interrupted reads are reissued.
pub fn scan_sequential<R, F>(reader: &mut R, mode: ScanMode, mut progress: F) -> Result<ScanReport>
where
    R: Read + Seek + ?Sized,
    F: FnMut(&ScanProgress),
{
    reader
        .seek(SeekFrom::Start(0))
        .context("failed to rewind target for sequential scan")?;

    // Aligned so the same loop works on handles opened for cache bypass
    let mut buffer = AlignedBuffer::new(SCAN_CHUNK, DIRECT_IO_BLOCK_SIZE)?;
    let buf = buffer.as_mut_slice();

    let limit = mode.limit();
    let mut total: u64 = 0;
    let mut step_total: u64 = 0;
    let mut reached_end = false;

    let start = Instant::now();
    let mut step = start;

    loop {
        let n = match reader.read(buf) {
            Ok(0) => {
                reached_end = true;
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("sequential read failed after {} bytes", total));
            }
        };

        total += n as u64;
        step_total += n as u64;

        if step.elapsed() >= PROGRESS_INTERVAL {
            progress(&ScanProgress {
                interval_bytes: step_total,
                total_bytes: total,
            });
            step = Instant::now();
            step_total = 0;
        }

        if let Some(limit) = limit {
            if start.elapsed() > limit {
                debug!("scan time limit reached after {} bytes", total);
                break;
            }
        }
    }

    let elapsed = start.elapsed();
    Ok(ScanReport {
        mode,
        bytes_read: total,
        elapsed,
        bytes_per_second: calculate_throughput(total, elapsed),
        reached_end,
    })
}
