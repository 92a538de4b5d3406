//! Uniform random distribution
//!
//! Every block has equal probability. Backed by xoshiro256++, which is fast
//! enough to sit in the read loop and fully determined by its seed.

use super::Distribution;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Uniform random distribution over `[0, num_blocks)`
#[derive(Debug, Clone)]
pub struct UniformDistribution {
    rng: Xoshiro256PlusPlus,
}

impl UniformDistribution {
    /// Create a distribution whose sequence is fully determined by `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl Distribution for UniformDistribution {
    #[inline(always)]
    fn next_block(&mut self, num_blocks: u64) -> u64 {
        if num_blocks == 0 {
            return 0;
        }
        self.rng.gen_range(0..num_blocks)
    }
}
