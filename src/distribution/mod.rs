//! Block number generation
//!
//! Distributions produce block numbers in `[0, num_blocks)`; the offset
//! generator scales them to byte offsets. Working in blocks keeps aligned
//! offsets aligned without any rounding: `offset = block_num * block_size`.
//!
//! # Example
//!
//! ```
//! use seeklat::distribution::{Distribution, uniform::UniformDistribution};
//!
//! let mut dist = UniformDistribution::with_seed(1);
//! let block_num = dist.next_block(1024);
//! assert!(block_num < 1024);
//!
//! let block_size = 4096;
//! let offset = block_num * block_size;
//! assert_eq!(offset % block_size, 0);
//! ```

/// Block number generator
///
/// Each worker owns its own instance, so implementations need no internal
/// synchronisation, only `Send` to move into the worker thread.
pub trait Distribution: Send {
    /// Next block number in `[0, num_blocks)`
    ///
    /// Returns 0 when `num_blocks` is 0.
    fn next_block(&mut self, num_blocks: u64) -> u64;
}

pub mod uniform;
