use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Inclusive uniform integer source for the simulated metrics.
pub trait RangeRng: Send {
    fn range(&mut self, min: u32, max: u32) -> u32;
}

/// `StdRng` behind [`RangeRng`]. A fixed seed replays the same numbers.
pub struct SeededRng(StdRng);

impl SeededRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Seeded when `seed` is set, otherwise from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::from_seed)
    }
}

impl RangeRng for SeededRng {
    fn range(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        self.0.gen_range(min..=max)
    }
}
