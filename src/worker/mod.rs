//! Read driver
//!
//! A [`Worker`] owns everything its read loop touches: the read buffer, its
//! own offset generator and, with `-hist`, a latency histogram. Only the
//! target handle is shared, and it is read through positioned reads, so
//! workers never synchronise with each other while timing.
//!
//! [`run_workers`] starts one named scoped thread per worker (`worker-0`,
//! `worker-1`, ...). Each thread sends exactly one message, its
//! [`TimingSample`] or its error, over a bounded channel sized to the worker
//! count, so no send ever blocks. The first failure raises a shared stop flag
//! that the other workers check between reads.
//!
//! # Example
//!
//! ```
//! use seeklat::config::{RunConfig, SeedMode};
//! use seeklat::engine::mock::MockReader;
//! use seeklat::worker::run_workers;
//! use std::path::PathBuf;
//!
//! let config = RunConfig {
//!     target: PathBuf::from("mock"),
//!     count: 50,
//!     workers: 2,
//!     direct: false,
//!     alignment: 4096,
//!     seed_mode: SeedMode::Reproducible,
//!     scan: None,
//!     buffer_size: 1,
//!     latency_histogram: false,
//!     json_output: None,
//!     debug: false,
//! };
//!
//! let reader = MockReader::new(1 << 20);
//! let timings = run_workers(&reader, &config, 1 << 20)?;
//! assert_eq!(timings.samples.len(), 2);
//! assert_eq!(reader.reads(), 100);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::RunConfig;
use crate::engine::PositionedRead;
use crate::error::BenchError;
use crate::offset::{worker_seed, OffsetGenerator};
use crate::stats::histogram::LatencyHistogram;
use crate::stats::TimingSample;
use crate::util::buffer::{ReadBuffer, DIRECT_IO_BLOCK_SIZE};
use crate::util::bytes::format_bytes_decimal;
use crate::Result;
use anyhow::Context;
use crossbeam::channel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One worker's read loop state
#[derive(Debug)]
pub struct Worker {
    id: usize,
    count: u64,
    buffer: ReadBuffer,
    offsets: OffsetGenerator,
    latency: Option<LatencyHistogram>,
}

impl Worker {
    /// Worker `id` of a run described by `config` over a target of `size` bytes
    ///
    /// Allocates the read buffer and seeds the offset generator, so nothing is
    /// allocated once the timed loop starts.
    pub fn new(id: usize, config: &RunConfig, size: u64) -> Result<Self> {
        let alignment = config.effective_alignment();

        let buffer_alignment = if config.direct {
            usize::try_from(alignment)
                .context("alignment does not fit in memory")?
                .max(DIRECT_IO_BLOCK_SIZE)
        } else {
            0
        };
        let buffer = ReadBuffer::new(config.buffer_size, buffer_alignment)
            .with_context(|| format!("worker {}: failed to allocate read buffer", id))?;

        let seed = worker_seed(config.seed_mode, id, config.workers);
        let offsets = OffsetGenerator::seeded(size, alignment, seed)?;
        debug!("worker {}: seed {}, {} B reads", id, seed, buffer.len());

        let latency = if config.latency_histogram {
            Some(LatencyHistogram::new()?)
        } else {
            None
        };

        Ok(Self {
            id,
            count: config.count,
            buffer,
            offsets,
            latency,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Bytes per read
    pub fn read_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn offsets(&self) -> &OffsetGenerator {
        &self.offsets
    }

    /// Issue `count` reads and time the whole loop
    ///
    /// Returns early, with fewer requests in the sample, once `stop` is set.
    ///
    /// # Errors
    ///
    /// The first failed read, as [`BenchError::Read`]. Nothing is retried.
    pub fn run<R: PositionedRead + ?Sized>(&mut self, reader: &R, stop: &AtomicBool) -> Result<TimingSample> {
        let start = Instant::now();
        let mut completed = 0u64;

        while completed < self.count {
            if stop.load(Ordering::Relaxed) {
                debug!("worker {}: stopped after {} reads", self.id, completed);
                break;
            }

            let offset = self.offsets.next_offset();
            let buf = self.buffer.as_mut_slice();

            let result = match self.latency.as_mut() {
                Some(hist) => {
                    let issued = Instant::now();
                    let result = reader.read_at(buf, offset);
                    hist.record(issued.elapsed());
                    result
                }
                None => reader.read_at(buf, offset),
            };

            if let Err(source) = result {
                return Err(BenchError::Read {
                    worker: self.id,
                    offset,
                    len: buf.len(),
                    source,
                }
                .into());
            }
            completed += 1;
        }

        let elapsed = start.elapsed();
        let sample = TimingSample::new(self.id, completed, elapsed);
        Ok(match self.latency.take() {
            Some(hist) => sample.with_latency(hist),
            None => sample,
        })
    }
}

/// Timings of the random-read phase
#[derive(Debug)]
pub struct RunTimings {
    /// One sample per worker, in worker order
    pub samples: Vec<TimingSample>,
    /// Wall clock from the first spawn until the last worker reported
    pub real_time: Duration,
}

/// Raises the stop flag if the owning thread unwinds
struct StopOnPanic<'a>(&'a AtomicBool);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

/// Run `config.workers` workers against `reader` and collect their timings
///
/// # Errors
///
/// The first worker error in arrival order, or
/// [`BenchError::WorkerPanicked`] if a worker panicked and none failed.
/// No report is produced for a partially failed run.
pub fn run_workers<R: PositionedRead + ?Sized>(reader: &R, config: &RunConfig, size: u64) -> Result<RunTimings> {
    let workers = (0..config.workers)
        .map(|id| Worker::new(id, config, size))
        .collect::<Result<Vec<_>>>()?;

    if let Some(warning) = workers.first().and_then(overrun_warning) {
        warn!("{}", warning);
    }

    let stop = AtomicBool::new(false);
    let (tx, rx) = channel::bounded::<Result<TimingSample>>(config.workers);

    let start = Instant::now();
    let (messages, real_time, panicked) = std::thread::scope(|s| -> Result<_> {
        let mut handles = Vec::with_capacity(workers.len());

        for mut worker in workers {
            let id = worker.id();
            let tx = tx.clone();
            let stop = &stop;

            let spawned = std::thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn_scoped(s, move || {
                    let _guard = StopOnPanic(stop);
                    let result = worker.run(reader, stop);
                    if result.is_err() {
                        stop.store(true, Ordering::Relaxed);
                    }
                    // Capacity covers every worker and the receiver outlives them
                    let _ = tx.send(result);
                });

            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    stop.store(true, Ordering::Relaxed);
                    return Err(e).with_context(|| format!("failed to spawn worker {}", id));
                }
            }
        }
        drop(tx);

        // Ends once every sender is gone: all workers reported or unwound
        let messages: Vec<Result<TimingSample>> = rx.iter().collect();
        let real_time = start.elapsed();

        let panicked: Vec<usize> = handles
            .into_iter()
            .filter_map(|(id, handle)| handle.join().err().map(|_| id))
            .collect();

        Ok((messages, real_time, panicked))
    })?;

    let mut samples = Vec::with_capacity(messages.len());
    for message in messages {
        samples.push(message?);
    }

    if let Some(&worker) = panicked.first() {
        return Err(BenchError::WorkerPanicked { worker }.into());
    }

    if samples.len() != config.workers {
        anyhow::bail!("expected {} worker results, got {}", config.workers, samples.len());
    }

    samples.sort_by_key(|s| s.worker);
    Ok(RunTimings { samples, real_time })
}

/// Warning for a read length that can run past the end of the target
///
/// Such reads are not clamped: they fail and abort the run.
fn overrun_warning(worker: &Worker) -> Option<String> {
    let read_len = worker.read_len() as u64;
    let offsets = worker.offsets();

    if read_len > offsets.size() {
        Some(format!(
            "reads of {} need a target at least that long, we will probably fail",
            format_bytes_decimal(read_len)
        ))
    } else if offsets.may_read_past_end(read_len) {
        Some(format!(
            "highest offset {} plus {} B reaches past the end ({} B), reads there will fail",
            offsets.max_offset(),
            read_len,
            offsets.size()
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedMode;
    use crate::engine::mock::MockReader;
    use std::path::PathBuf;

    fn config(workers: usize, count: u64) -> RunConfig {
        RunConfig {
            target: PathBuf::from("mock"),
            count,
            workers,
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

    #[test]
    fn test_single_worker_run() {
        let reader = MockReader::new(1 << 20);
        let mut worker = Worker::new(0, &config(1, 25), 1 << 20).unwrap();
        let stop = AtomicBool::new(false);

        let sample = worker.run(&reader, &stop).unwrap();
        assert_eq!(sample.worker, 0);
        assert_eq!(sample.requests, 25);
        assert!(sample.latency.is_none());
        assert_eq!(reader.reads(), 25);
    }

    #[test]
    fn test_worker_honours_stop_flag() {
        let reader = MockReader::new(1 << 20);
        let mut worker = Worker::new(0, &config(1, 1000), 1 << 20).unwrap();
        let stop = AtomicBool::new(true);

        let sample = worker.run(&reader, &stop).unwrap();
        assert_eq!(sample.requests, 0);
        assert_eq!(reader.reads(), 0);
    }

    #[test]
    fn test_worker_read_error() {
        let reader = MockReader::new(100);
        let mut cfg = config(1, 10);
        cfg.buffer_size = 200;
        let mut worker = Worker::new(0, &cfg, 100).unwrap();

        let err = worker.run(&reader, &AtomicBool::new(false)).unwrap_err();
        match err.downcast_ref::<BenchError>() {
            Some(BenchError::Read { worker: 0, len: 200, .. }) => {}
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(reader.reads(), 1);
    }

    #[test]
    fn test_latency_histogram_collected() {
        let reader = MockReader::new(1 << 20);
        let mut cfg = config(1, 40);
        cfg.latency_histogram = true;
        let mut worker = Worker::new(0, &cfg, 1 << 20).unwrap();

        let sample = worker.run(&reader, &AtomicBool::new(false)).unwrap();
        assert_eq!(sample.latency.unwrap().len(), 40);
    }

    #[test]
    fn test_direct_buffer_is_aligned() {
        let mut cfg = config(1, 1);
        cfg.direct = true;
        cfg.buffer_size = 4096;
        let worker = Worker::new(0, &cfg, 1 << 20).unwrap();
        assert!(matches!(worker.buffer, ReadBuffer::Aligned(ref b) if b.is_aligned()));
        assert_eq!(worker.read_len(), 4096);
    }

    #[test]
    fn test_run_workers_collects_all_samples() {
        let reader = MockReader::new(1 << 30);
        let timings = run_workers(&reader, &config(4, 30), 1 << 30).unwrap();

        assert_eq!(timings.samples.len(), 4);
        let ids: Vec<usize> = timings.samples.iter().map(|s| s.worker).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(timings.samples.iter().all(|s| s.requests == 30));
        assert_eq!(reader.reads(), 120);
    }

    #[test]
    fn test_run_workers_propagates_failure() {
        let reader = MockReader::new(1 << 30)
            .with_delay(Duration::from_millis(1))
            .fail_on("worker-2", 3);

        let err = run_workers(&reader, &config(4, 1000), 1 << 30).unwrap_err();
        match err.downcast_ref::<BenchError>() {
            Some(BenchError::Read { worker: 2, .. }) => {}
            other => panic!("unexpected error: {:?}", other),
        }
        // The other workers were stopped well before finishing their loops
        assert!(reader.reads() < 4000);
    }

    #[test]
    fn test_overrun_warning_read_longer_than_target() {
        let mut cfg = config(1, 1);
        cfg.buffer_size = 4096;
        let worker = Worker::new(0, &cfg, 1000).unwrap();

        let warning = overrun_warning(&worker).unwrap();
        assert!(warning.starts_with("reads of 4.10 kB need a target"));
    }

    #[test]
    fn test_overrun_warning_last_block_past_end() {
        // Unaligned offsets run 0..=998: a 2-byte read at 998 still fits, a 3-byte one does not
        let mut cfg = config(1, 1);
        cfg.buffer_size = 3;
        let worker = Worker::new(0, &cfg, 1000).unwrap();

        let warning = overrun_warning(&worker).unwrap();
        assert_eq!(
            warning,
            "highest offset 998 plus 3 B reaches past the end (1000 B), reads there will fail"
        );
    }

    #[test]
    fn test_no_overrun_warning_when_reads_fit() {
        let mut cfg = config(1, 1);
        cfg.buffer_size = 2;
        let worker = Worker::new(0, &cfg, 1000).unwrap();
        assert_eq!(overrun_warning(&worker), None);

        let mut cfg = config(1, 1);
        cfg.direct = true;
        cfg.buffer_size = 4096;
        let worker = Worker::new(0, &cfg, 1 << 20).unwrap();
        assert_eq!(overrun_warning(&worker), None);
    }

    #[test]
    fn test_too_small_target() {
        let reader = MockReader::new(1);
        let err = run_workers(&reader, &config(1, 1), 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::TargetTooSmall { size: 1 })
        ));
    }
}
