//! Seeded dice generator
//!
//! The whole generator state is a single `u64` seed. After every roll the
//! engine calls `advance`, which draws the next seed from the stream and
//! reseeds, so persisting `seed()` is enough to resume the exact sequence.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic die roller
#[derive(Clone, Debug)]
pub struct DiceRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl DiceRng {
    /// Create a generator at `seed`
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// A fresh seed from the thread-local entropy source
    pub fn entropy_seed() -> u64 {
        rand::rng().random()
    }

    /// Current seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the stream at `seed`
    pub fn reseed(&mut self, seed: u64) {
        self.inner = ChaCha8Rng::seed_from_u64(seed);
        self.seed = seed;
    }

    /// Roll one die with `sides` sides (at least 1)
    pub fn roll_die(&mut self, sides: u32) -> u32 {
        self.inner.random_range(1..=sides.max(1))
    }

    /// Roll `count` dice with `sides` sides
    pub fn roll_dice(&mut self, count: u32, sides: u32) -> Vec<u32> {
        (0..count).map(|_| self.roll_die(sides)).collect()
    }

    /// Roll a single d20
    pub fn d20(&mut self) -> u32 {
        self.roll_die(20)
    }

    /// Move to the next state, returning the new seed
    pub fn advance(&mut self) -> u64 {
        let next = self.inner.next_u64();
        self.reseed(next);
        next
    }
}
