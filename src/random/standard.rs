//! Seeded generator facade with the distributions used by toys and fits

use crate::numeric::Float;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Random number generation engine in use
type Engine = rand_xoshiro::Xoshiro256Plus;

/// Default seed, used when none is configured
pub const DEFAULT_SEED: u64 = 12345;

/// Facade which exposes the few distributions needed by the analysis
#[derive(Clone, Debug)]
pub struct RandomGenerator {
    rng: Engine,
}
//
impl RandomGenerator {
    /// Spawn a new random number generator
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Engine::seed_from_u64(seed),
        }
    }

    /// Generate a random floating-point number between 0 and 1
    pub fn random(&mut self) -> Float {
        self.rng.gen()
    }

    /// Generate a uniform random number in [low, high)
    pub fn uniform(&mut self, low: Float, high: Float) -> Float {
        low + (high - low) * self.random()
    }

    /// Generate a Gaussian random number
    ///
    /// A non-positive or non-finite width returns the mean unchanged.
    ///
    pub fn gaussian(&mut self, mean: Float, sigma: Float) -> Float {
        match Normal::new(mean, sigma) {
            Ok(normal) if sigma > 0. => normal.sample(&mut self.rng),
            _ => mean,
        }
    }
}
//
impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}
