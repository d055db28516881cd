//! Randomness seam for driver assignment, driver start offsets and route bends.
//!
//! Sessions draw through [`RandomSource`] so tests can pin outcomes with a seed
//! or replace the source entirely.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send + Sync {
    /// Uniform sample in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Uniform index into a collection of `len` items; `None` when `len == 0`.
    fn choose_index(&mut self, len: usize) -> Option<usize>;

    /// Raw 64 random bits, used for identifiers.
    fn next_u64(&mut self) -> u64;
}

/// [`RandomSource`] backed by `StdRng`. Seeded when a seed is given, otherwise
/// drawn from OS entropy.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(Some(seed))
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn choose_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.rng.gen_range(0..len))
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }
}
