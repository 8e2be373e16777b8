//! Deterministic RNG hierarchy.
//!
//! A master seed expands into sub-seeds keyed by `(scope, index)`, e.g.
//! `("window", 3)` or `("split", 0)`. Derivation is a BLAKE3 hash of the key,
//! so a window's sampler seed does not depend on which thread reaches it first.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for `(scope, index)`.
    pub fn sub_seed(&self, scope: &str, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(scope.as_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut first = [0u8; 8];
        first.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(first)
    }

    pub fn rng_for(&self, scope: &str, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(scope, index))
    }
}
