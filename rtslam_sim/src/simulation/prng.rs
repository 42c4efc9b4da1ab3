// rtslam_sim/src/simulation/prng.rs

use anyhow::Context;
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The single deterministic pseudo-random number generator of a run.
#[derive(Debug, Clone)]
pub struct SimulationRng(pub ChaCha8Rng);

impl SimulationRng {
    /// Seeds from `seed` when given, from the OS otherwise.
    pub fn new(seed: Option<u64>) -> anyhow::Result<Self> {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(OsRng).context("OS RNG failed")?,
        };
        Ok(Self(rng))
    }
}
