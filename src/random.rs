//! Generator-wide random number source.
//!
//! Every stage of the pipeline draws from one seeded `Random` passed by mutable reference, so that
//! two runs with the same seed produce the same fleet.

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

pub struct Random {
    rand: Pcg64,
}

impl Random {
    /// Creates a new generator with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rand: Pcg64::seed_from_u64(seed),
        }
    }

    /// Returns a random number in the specified range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cloudfactory::random::Random;
    ///
    /// let mut random = Random::new(123);
    /// let n: u32 = random.gen_range(1..=10);
    /// assert!(n >= 1 && n <= 10);
    /// ```
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    /// Returns a random value from the specified distribution.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        dist.sample(&mut self.rand)
    }

    /// Draws `count` values from the specified distribution.
    pub fn sample_many<T, Dist: Distribution<T>>(&mut self, dist: &Dist, count: usize) -> Vec<T> {
        (0..count)
            .map(|_| self.sample_from_distribution(dist))
            .collect()
    }

    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        values.shuffle(&mut self.rand);
    }

    /// Uniformly picks an index in `0..len`. `len` must be positive.
    pub fn choose_index(&mut self, len: usize) -> usize {
        self.rand.gen_range(0..len)
    }
}
