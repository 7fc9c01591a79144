//! Deterministic key-to-shard mapping for the sharded key index.
//!
//! ```text
//!   key ──► FxHasher(seed, key) ──► hash & (shards - 1) ──► shard index
//!
//!   ┌─────────┬─────────┬─────────┬─────────┐
//!   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │
//!   │  A, E   │  B, F   │  C, G   │  D, H   │
//!   └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! The shard count is rounded up to a power of two so selection is a mask
//! rather than a division. The same `(key, seed, shards)` always maps to the
//! same shard.
//!
//! ## Example Usage
//!
//! ```
//! use rankkit::ds::ShardSelector;
//!
//! let selector = ShardSelector::new(6, 0);
//! assert_eq!(selector.shard_count(), 8);
//!
//! let shard = selector.shard_for_key(&"user:123");
//! assert!(shard < 8);
//! assert_eq!(selector.shard_for_key(&"user:123"), shard);
//! ```

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Seeded shard selector over a power-of-two shard count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSelector {
    mask: usize,
    seed: u64,
}

impl ShardSelector {
    /// Creates a selector for at least `shards` shards (rounded up to a power
    /// of two, minimum 1).
    pub fn new(shards: usize, seed: u64) -> Self {
        let shards = shards.max(1).next_power_of_two();
        Self {
            mask: shards - 1,
            seed,
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.mask + 1
    }

    /// Maps a key to a shard index in `[0, shard_count)`.
    pub fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = FxHasher::default();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        // Fx leaves the low bits weak for small integers; fold the high half in.
        let hash = hasher.finish();
        ((hash ^ (hash >> 32)) as usize) & self.mask
    }
}

impl Default for ShardSelector {
    /// A single-shard selector with seed 0.
    fn default() -> Self {
        Self::new(1, 0)
    }
}
