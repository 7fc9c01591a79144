//! Sharded key → node index for the concurrent engine.
//!
//! Each shard is an `FxHashMap` behind its own `parking_lot::RwLock`, so
//! lookups of different keys rarely contend and lookups of the same key
//! share a read lock. The one write-side primitive that matters is
//! [`ShardedIndex::insert_if_absent`]: the atomic create-if-absent publish a
//! registering thread uses to claim a first-seen key.
//!
//! ```text
//!   register("k")
//!        │
//!        ▼
//!   ShardSelector ──► shard 2 ──► RwLock<FxHashMap<K, NodeRef>>
//!                                   read():  get
//!                                   write(): insert_if_absent / remove_if
//! ```

use std::hash::Hash;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ds::node_arena::NodeRef;
use crate::ds::shard::ShardSelector;

#[derive(Debug)]
pub struct ShardedIndex<K> {
    shards: Box<[RwLock<FxHashMap<K, NodeRef>>]>,
    selector: ShardSelector,
}

impl<K> ShardedIndex<K>
where
    K: Eq + Hash,
{
    /// Creates an index with `shards` shards (rounded up to a power of two),
    /// reserving room for about `capacity` keys in total.
    pub fn new(shards: usize, seed: u64, capacity: usize) -> Self {
        let selector = ShardSelector::new(shards, seed);
        let per_shard = capacity.div_ceil(selector.shard_count());
        let shards = (0..selector.shard_count())
            .map(|_| {
                RwLock::new(FxHashMap::with_capacity_and_hasher(
                    per_shard,
                    Default::default(),
                ))
            })
            .collect();
        Self { shards, selector }
    }

    #[inline]
    fn shard(&self, key: &K) -> &RwLock<FxHashMap<K, NodeRef>> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    pub fn get(&self, key: &K) -> Option<NodeRef> {
        self.shard(key).read().get(key).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Publishes `node` for `key` unless another node is already published,
    /// in which case that node is returned as the error.
    pub fn insert_if_absent(&self, key: K, node: NodeRef) -> Result<(), NodeRef> {
        let mut shard = self.shard(&key).write();
        match shard.get(&key) {
            Some(existing) => Err(*existing),
            None => {
                shard.insert(key, node);
                Ok(())
            },
        }
    }

    /// Removes `key` only while it still maps to `node`.
    pub fn remove_if(&self, key: &K, node: NodeRef) -> bool {
        let mut shard = self.shard(key).write();
        if shard.get(key) == Some(&node) {
            shard.remove(key);
            true
        } else {
            false
        }
    }

    /// Sum of the shard sizes. Only exact while no mutation is in flight.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    pub fn shard_count(&self) -> usize {
        self.selector.shard_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::slot_arena::SlotId;

    fn node(slot: usize, generation: u64) -> NodeRef {
        NodeRef::new(SlotId::new(slot), generation)
    }

    #[test]
    fn insert_if_absent_reports_winner() {
        let index = ShardedIndex::new(4, 0, 16);
        assert_eq!(index.insert_if_absent("a", node(2, 1)), Ok(()));
        assert_eq!(index.insert_if_absent("a", node(3, 1)), Err(node(2, 1)));
        assert_eq!(index.get(&"a"), Some(node(2, 1)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_if_ignores_stale_node() {
        let index = ShardedIndex::new(2, 7, 0);
        index.insert_if_absent("a", node(2, 3)).unwrap();

        assert!(!index.remove_if(&"a", node(2, 2)));
        assert!(index.contains(&"a"));

        assert!(index.remove_if(&"a", node(2, 3)));
        assert!(index.is_empty());
        assert_eq!(index.get(&"a"), None);
    }

    #[test]
    fn many_keys_across_shards() {
        let index = ShardedIndex::new(8, 0, 64);
        assert_eq!(index.shard_count(), 8);
        for k in 0..100u64 {
            index.insert_if_absent(k, node(k as usize + 2, 1)).unwrap();
        }
        assert_eq!(index.len(), 100);
        for k in 0..100u64 {
            assert_eq!(index.get(&k), Some(node(k as usize + 2, 1)));
        }
    }
}
