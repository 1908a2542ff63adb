use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A wrapper for the seeded random generator used by dropout.
///
/// Two instances built from the same seed yield the same sequence, which is
/// what keeps dropout reproducible between the training and serving paths.
#[derive(Debug)]
pub struct Random {
    rng: StdRng,
}

impl Random {
    /// Constructor, with specific seed
    pub fn with_seed(seed: u64) -> Self {
        Random {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate random double in [0.0, 1.0)
    pub fn next_double(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
