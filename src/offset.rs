//! Read offset generation
//!
//! Offsets are drawn uniformly from `[0, size - 1)`. Under cache bypass they
//! are quantized: a block index is drawn from `[0, (size - 1) / alignment)` and
//! scaled by the alignment, so every offset is a multiple of it.
//!
//! The quantized range is computed on `size - 1`, not on `size - read_len`. When
//! the alignment does not divide the span, or the read is longer than the slack
//! left after the last aligned offset, the final block can reach past the end
//! of the target. That read is not clamped: it fails, and the failure is the
//! measurement. [`OffsetGenerator::may_read_past_end`] exposes the condition so
//! the driver can warn before the run starts.
//!
//! # Seeding
//!
//! Reproducible runs seed every worker from a pure function of its index, so
//! the same configuration always replays the same offsets against a device.
//! True-random runs mix in the process id and the current time.

use crate::config::SeedMode;
use crate::distribution::{uniform::UniformDistribution, Distribution};
use crate::error::BenchError;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seed of a single-worker reproducible run
pub const DEFAULT_SEED: u64 = 1;

/// Seed for worker `worker` out of `workers`
///
/// Reproducible mode uses [`DEFAULT_SEED`] for a single worker and the worker
/// index otherwise.
pub fn worker_seed(mode: SeedMode, worker: usize, workers: usize) -> u64 {
    match mode {
        SeedMode::Reproducible if workers == 1 => DEFAULT_SEED,
        SeedMode::Reproducible => worker as u64,
        SeedMode::TrueRandom => entropy_seed().wrapping_add(worker as u64),
    }
}

fn entropy_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    u64::from(std::process::id()).wrapping_add(nanos)
}

/// Lazily generated offsets within one target
///
/// Also an endless [`Iterator`], which is handy for collecting a prefix of
/// the stream.
#[derive(Debug, Clone)]
pub struct OffsetGenerator<D: Distribution = UniformDistribution> {
    dist: D,
    size: u64,
    alignment: u64,
    num_blocks: u64,
}

impl OffsetGenerator<UniformDistribution> {
    /// Uniform generator seeded with `seed`
    pub fn seeded(size: u64, alignment: u64, seed: u64) -> Result<Self, BenchError> {
        Self::new(size, alignment, UniformDistribution::with_seed(seed))
    }
}

impl<D: Distribution> OffsetGenerator<D> {
    /// Generator over a target of `size` bytes
    ///
    /// `alignment` of 0 means unaligned offsets.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::TargetTooSmall`] if `size < 2`, which leaves the
    /// range `[0, size - 1)` empty.
    pub fn new(size: u64, alignment: u64, dist: D) -> Result<Self, BenchError> {
        if size < 2 {
            return Err(BenchError::TargetTooSmall { size });
        }

        let span = size - 1;
        let num_blocks = if alignment > 0 { span / alignment } else { span };

        Ok(Self {
            dist,
            size,
            alignment,
            num_blocks,
        })
    }

    #[inline(always)]
    pub fn next_offset(&mut self) -> u64 {
        let block = self.dist.next_block(self.num_blocks);
        if self.alignment > 0 {
            block * self.alignment
        } else {
            block
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Largest offset this generator can return
    pub fn max_offset(&self) -> u64 {
        self.num_blocks.saturating_sub(1) * self.alignment.max(1)
    }

    /// Whether a read of `read_len` bytes at [`max_offset`](Self::max_offset)
    /// would extend past the end of the target
    pub fn may_read_past_end(&self, read_len: u64) -> bool {
        self.max_offset().saturating_add(read_len) > self.size
    }
}

impl<D: Distribution> Iterator for OffsetGenerator<D> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        Some(self.next_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(size: u64, alignment: u64, seed: u64, n: usize) -> Vec<u64> {
        OffsetGenerator::seeded(size, alignment, seed)
            .unwrap()
            .take(n)
            .collect()
    }

    #[test]
    fn test_unaligned_offsets_in_range() {
        for size in [2u64, 3, 17, 4096, 1 << 20, 1 << 40] {
            for offset in collect(size, 0, 3, 2000) {
                assert!(offset < size - 1, "offset {} out of range for size {}", offset, size);
            }
        }
    }

    #[test]
    fn test_aligned_offsets_in_range_and_aligned() {
        for alignment in [512u64, 4096] {
            for size in [alignment, alignment + 1, 2 * alignment, 10 * alignment + 7, 1 << 30] {
                for offset in collect(size, alignment, 9, 2000) {
                    assert!(offset < size - 1, "offset {} out of range for size {}", offset, size);
                    assert_eq!(offset % alignment, 0);
                }
            }
        }
    }

    #[test]
    fn test_size_equal_to_alignment_always_zero() {
        assert!(collect(4096, 4096, 1, 100).iter().all(|&o| o == 0));
    }

    #[test]
    fn test_too_small_target_rejected() {
        assert!(matches!(
            OffsetGenerator::seeded(1, 0, 1),
            Err(BenchError::TargetTooSmall { size: 1 })
        ));
        assert!(OffsetGenerator::seeded(0, 4096, 1).is_err());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        assert_eq!(collect(1 << 30, 4096, 5, 500), collect(1 << 30, 4096, 5, 500));
    }

    #[test]
    fn test_reproducible_seeds() {
        assert_eq!(worker_seed(SeedMode::Reproducible, 0, 1), DEFAULT_SEED);
        assert_eq!(worker_seed(SeedMode::Reproducible, 0, 4), 0);
        assert_eq!(worker_seed(SeedMode::Reproducible, 3, 4), 3);
    }

    #[test]
    fn test_true_random_seeds_differ_per_worker() {
        let a = worker_seed(SeedMode::TrueRandom, 0, 2);
        let b = worker_seed(SeedMode::TrueRandom, 1, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_max_offset() {
        // 10 full blocks plus 7 bytes: blocks 0..10, last offset 9 * 4096
        let gen = OffsetGenerator::seeded(10 * 4096 + 7, 4096, 1).unwrap();
        assert_eq!(gen.max_offset(), 9 * 4096);
        assert!(!gen.may_read_past_end(4096));

        let gen = OffsetGenerator::seeded(1000, 0, 1).unwrap();
        assert_eq!(gen.max_offset(), 998);
        assert!(!gen.may_read_past_end(1));
        assert!(gen.may_read_past_end(3));
    }

    #[test]
    fn test_exact_multiple_can_overrun() {
        // (8192 - 1) / 4096 == 1 block: offset 0 only, fits
        let gen = OffsetGenerator::seeded(8192, 4096, 1).unwrap();
        assert!(!gen.may_read_past_end(4096));

        // Smaller than one transfer unit: offset 0 but the read is longer than the target
        let gen = OffsetGenerator::seeded(1000, 4096, 1).unwrap();
        assert_eq!(gen.max_offset(), 0);
        assert!(gen.may_read_past_end(4096));
    }
}
