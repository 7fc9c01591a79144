//! # Concurrent Frequency Ranking
//!
//! Lock-coupled engine: any number of threads may `register` at once, while
//! snapshot reads (`top`, `statistics`, `len`) observe a quiescent list.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────────────────────────────────────────────────┐
//!   │                        ConcurrentRanking<K>                             │
//!   │                                                                         │
//!   │   gate: SnapshotGate           register ─► shared  │ snapshot ─► excl.  │
//!   │                                                                         │
//!   │   index: ShardedIndex<K>       K ──► NodeRef { slot, generation }       │
//!   │                                                                         │
//!   │   arena: NodeArena<K>          slot ──► Mutex<RankNode<K>>              │
//!   │                                                                         │
//!   │     TOP ─► [A:3] ◄─► [C:1] ◄─► [B:1] ◄─ BOTTOM                          │
//!   │                        ▲                                                │
//!   │   insertion_point: AtomicUsize (slot index)                             │
//!   │   size:            AtomicUsize                                          │
//!   └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lock Order
//!
//! Every node has its own lock. A thread only ever waits for the
//! *predecessor* of a node it already holds, or takes its first lock while
//! holding nothing, so locks are always acquired from a node toward `TOP`.
//! A first-seen key's candidate node is locked before it is published and
//! stays locked until it is linked; threads that find it through the index
//! wait for it while holding nothing.
//!
//! ```text
//!   promote(item), window of four locks:
//!
//!      pp ◄── prev ◄── item ◄── next          acquired: next, item, prev, pp
//!
//!   leapfrog one step:
//!
//!      pp ─► item ─► prev ─► next             window slides: next := prev,
//!                                                            prev := pp
//! ```
//!
//! ## Register Flow
//!
//! ```text
//!   register(key)
//!        │
//!        ▼
//!   gate.mutation()
//!        │
//!        ├── index hit ──────────────────────────► promote(node)
//!        │
//!        └── index miss ─► alloc candidate (locked)
//!                          insert_if_absent
//!                            ├── won ──► add(candidate) ─► evict while over capacity
//!                            └── lost ─► tombstone candidate, promote(winner)
//! ```
//!
//! ## Races Absorbed Internally
//!
//! | Race                               | Handling                            |
//! |------------------------------------|-------------------------------------|
//! | two threads create the same key    | loser promotes the winner           |
//! | insertion point moved before lock  | reload and retry                    |
//! | successor relocated before lock    | release all and retry `promote`     |
//! | node evicted before lock           | occurrence dropped                  |
//!
//! The last case is the one way an occurrence can go uncounted: the key was
//! the lowest-weight entry and was evicted between the index probe and the
//! node lock. Its next occurrence recreates it.
//!
//! ## Thread Safety
//!
//! `ConcurrentRanking<K>` is `Send + Sync` for `K: Send + Sync`. Share it
//! behind an `Arc`.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::MutexGuard;
use tracing::{debug, trace};

use crate::builder::default_index_shards;
use crate::ds::node_arena::{NodeArena, NodeRef};
use crate::ds::rank_list::{BOTTOM, RankNode, TOP, heal, link_between};
use crate::ds::sharded_index::ShardedIndex;
use crate::ds::slot_arena::SlotId;
use crate::error::{ConfigError, GateTimeout, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::AtomicRankingMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::RankingMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{ConcurrentMetricsRecorder, MetricsReset, MetricsSnapshotProvider};
use crate::ranking::snapshot::{SnapshotGate, collect_statistics, collect_top};
use crate::traits::{ConcurrentFrequencyRanking, FrequencyRanking, Statistics};

/// Thread-safe bounded frequency ranking.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use rankkit::ranking::concurrent::ConcurrentRanking;
///
/// let ranking = Arc::new(ConcurrentRanking::new(16));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let ranking = Arc::clone(&ranking);
///         thread::spawn(move || {
///             for _ in 0..10 {
///                 ranking.register("hot");
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(ranking.len(), 1);
/// assert_eq!(ranking.statistics(1)[&"hot"], 40);
/// ```
pub struct ConcurrentRanking<K> {
    arena: NodeArena<K>,
    index: ShardedIndex<K>,
    gate: SnapshotGate,
    insertion_point: AtomicUsize,
    size: AtomicUsize,
    capacity: usize,
    #[cfg(feature = "metrics")]
    metrics: AtomicRankingMetrics,
}

impl<K> ConcurrentRanking<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty ranking holding at most `capacity` keys, with the
    /// default number of index shards.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. See [`try_new`](Self::try_new).
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(ranking) => ranking,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates an empty ranking, returning an error on zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_options(capacity, default_index_shards(), 0, true)
    }

    pub(crate) fn with_options(
        capacity: usize,
        shards: usize,
        seed: u64,
        preallocate: bool,
    ) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if shards == 0 {
            return Err(ConfigError::ZeroIndexShards);
        }
        let reserve = if preallocate { capacity.saturating_add(1) } else { 0 };
        let index = ShardedIndex::new(shards, seed, reserve);
        debug!(capacity, shards = index.shard_count(), "created concurrent ranking");
        Ok(Self {
            arena: NodeArena::with_capacity(reserve),
            index,
            gate: SnapshotGate::new(),
            insertion_point: AtomicUsize::new(BOTTOM.index()),
            size: AtomicUsize::new(0),
            capacity,
            #[cfg(feature = "metrics")]
            metrics: AtomicRankingMetrics::default(),
        })
    }

    /// Records one occurrence of `key`. Waits while a snapshot read is in
    /// progress.
    pub fn register(&self, key: K) {
        let _permit = self.gate.mutation();
        self.register_admitted(key);
    }

    /// Like [`register`](Self::register), giving up if a snapshot read
    /// holds the gate for longer than `timeout`. On `Err` the occurrence
    /// has not been recorded.
    pub fn try_register_for(&self, key: K, timeout: Duration) -> Result<(), GateTimeout> {
        let _permit = self.gate.try_mutation_for(timeout)?;
        self.register_admitted(key);
        Ok(())
    }

    fn register_admitted(&self, key: K) {
        #[cfg(feature = "metrics")]
        self.metrics.record_register();

        if let Some(node) = self.index.get(&key) {
            self.promote(node);
            return;
        }

        let (candidate, guard) = self.arena.alloc(key.clone());
        match self.index.insert_if_absent(key, candidate) {
            Ok(()) => self.add(candidate, guard),
            Err(winner) => {
                let mut guard = guard;
                guard.tombstone();
                drop(guard);
                self.arena.release(candidate.slot());

                #[cfg(feature = "metrics")]
                self.metrics.record_create_race_lost();
                trace!(slot = candidate.slot().index(), "lost create race, promoting winner");

                self.promote(winner);
            },
        }
    }

    /// Links a freshly published node in front of the insertion point.
    fn add(&self, node: NodeRef, mut item: MutexGuard<'_, RankNode<K>>) {
        loop {
            let ip = SlotId::new(self.insertion_point.load(Ordering::Acquire));
            let mut anchor = self.arena.lock(ip);
            if self.insertion_point.load(Ordering::Acquire) != ip.index() || anchor.is_tombstoned()
            {
                #[cfg(feature = "metrics")]
                self.metrics.record_stale_insertion_point();
                trace!(slot = ip.index(), "stale insertion point, retrying");
                continue;
            }

            let prev = anchor.prev;
            let mut before = self.arena.lock(prev);
            item.set_weight(anchor.rank());
            link_between(node.slot(), &mut item, prev, &mut before, ip, &mut anchor);
            self.insertion_point
                .store(node.slot().index(), Ordering::Release);
            self.size.fetch_add(1, Ordering::AcqRel);
            break;
        }
        drop(item);

        #[cfg(feature = "metrics")]
        self.metrics.record_insert();

        while self.size.load(Ordering::Acquire) > self.capacity {
            if !self.evict_lowest() {
                break;
            }
        }
    }

    /// Evicts `BOTTOM.prev` if the ranking is over capacity. Returns `false`
    /// when there was nothing to do.
    fn evict_lowest(&self) -> bool {
        let mut bottom = self.arena.lock(BOTTOM);
        let victim = bottom.prev;
        if victim == TOP {
            return false;
        }
        let mut doomed = self.arena.lock(victim);
        if self.size.load(Ordering::Acquire) <= self.capacity {
            return false;
        }
        let pred = doomed.prev;
        let mut before = self.arena.lock(pred);
        heal(pred, &mut before, BOTTOM, &mut bottom);

        let fallback = if pred == TOP { BOTTOM } else { pred };
        let _ = self.insertion_point.compare_exchange(
            victim.index(),
            fallback.index(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        let weight = doomed.weight();
        let generation = doomed.generation;
        if let Some(key) = doomed.tombstone() {
            self.index.remove_if(&key, NodeRef::new(victim, generation));
        }
        let len = self.size.fetch_sub(1, Ordering::AcqRel) - 1;
        drop(before);
        drop(doomed);
        drop(bottom);
        self.arena.release(victim);

        #[cfg(feature = "metrics")]
        self.metrics.record_evict();
        debug!(evicted_weight = weight, len, "evicted lowest-weight key");
        true
    }

    /// Increments `node` and moves it up past every predecessor whose
    /// weight does not exceed the new weight. Returns `false` if the node
    /// was evicted before it could be locked.
    fn promote(&self, node: NodeRef) -> bool {
        let id = node.slot();
        loop {
            let next = {
                let item = self.arena.lock(id);
                if !item.is_live(node.generation()) {
                    self.record_tombstone_abort(id);
                    return false;
                }
                item.next
            };

            let mut next_guard = self.arena.lock(next);
            if next_guard.prev != id {
                self.record_relocation_retry(id);
                continue;
            }
            let mut item = self.arena.lock(id);
            if !item.is_live(node.generation()) {
                self.record_tombstone_abort(id);
                return false;
            }
            if item.next != next {
                self.record_relocation_retry(id);
                continue;
            }

            let Some(weight) = item.increment() else {
                self.record_tombstone_abort(id);
                return false;
            };

            #[cfg(feature = "metrics")]
            self.metrics.record_promote();

            if next != BOTTOM && next_guard.rank() < weight {
                let _ = self.insertion_point.compare_exchange(
                    id.index(),
                    next.index(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }

            let mut succ = next;
            let mut prev = item.prev;
            let mut prev_guard = self.arena.lock(prev);
            while prev != TOP && prev_guard.rank() <= weight {
                let pp = prev_guard.prev;
                let mut pp_guard = self.arena.lock(pp);
                heal(pp, &mut pp_guard, id, &mut item);
                link_between(prev, &mut prev_guard, id, &mut item, succ, &mut next_guard);

                #[cfg(feature = "metrics")]
                self.metrics.record_promote_step();

                succ = prev;
                next_guard = prev_guard;
                prev = pp;
                prev_guard = pp_guard;
            }
            return true;
        }
    }

    fn record_tombstone_abort(&self, id: SlotId) {
        #[cfg(feature = "metrics")]
        self.metrics.record_tombstone_abort();
        trace!(slot = id.index(), "node evicted before promotion, occurrence dropped");
    }

    fn record_relocation_retry(&self, id: SlotId) {
        #[cfg(feature = "metrics")]
        self.metrics.record_relocation_retry();
        trace!(slot = id.index(), "successor relocated, retrying promotion");
    }

    /// Copies up to `count` entries from `TOP` down. Caller holds the
    /// snapshot permit.
    fn snapshot_entries(&self, count: usize) -> Vec<(K, u64)> {
        #[cfg(feature = "metrics")]
        self.metrics.record_snapshot_read();

        let limit = count.min(self.size.load(Ordering::Acquire));
        let mut entries = Vec::with_capacity(limit);
        let mut current = self.arena.lock(TOP).next;
        while current != BOTTOM && entries.len() < limit {
            let node = self.arena.lock(current);
            if let (Some(key), Some(weight)) = (node.key(), node.weight()) {
                entries.push((key.clone(), weight));
            }
            current = node.next;
        }
        entries
    }

    /// Up to `count` keys, heaviest first, from one consistent snapshot.
    pub fn top(&self, count: usize) -> Vec<K> {
        let _permit = self.gate.snapshot();
        let len = self.size.load(Ordering::Acquire);
        collect_top(self.snapshot_entries(count), count, len)
    }

    /// Like [`top`](Self::top), giving up after `timeout`.
    pub fn try_top_for(&self, count: usize, timeout: Duration) -> Result<Vec<K>, GateTimeout> {
        let _permit = self.gate.try_snapshot_for(timeout)?;
        let len = self.size.load(Ordering::Acquire);
        Ok(collect_top(self.snapshot_entries(count), count, len))
    }

    /// Up to `count` keys with weights, heaviest first, from one consistent
    /// snapshot.
    pub fn statistics(&self, count: usize) -> Statistics<K> {
        let _permit = self.gate.snapshot();
        let len = self.size.load(Ordering::Acquire);
        collect_statistics(self.snapshot_entries(count), count, len)
    }

    /// Like [`statistics`](Self::statistics), giving up after `timeout`.
    pub fn try_statistics_for(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<Statistics<K>, GateTimeout> {
        let _permit = self.gate.try_snapshot_for(timeout)?;
        let len = self.size.load(Ordering::Acquire);
        Ok(collect_statistics(self.snapshot_entries(count), count, len))
    }

    /// Number of tracked keys, serialized against registrations.
    pub fn len(&self) -> usize {
        let _permit = self.gate.snapshot();
        self.size.load(Ordering::Acquire)
    }

    /// Like [`len`](Self::len), giving up after `timeout`.
    pub fn try_len_for(&self, timeout: Duration) -> Result<usize, GateTimeout> {
        let _permit = self.gate.try_snapshot_for(timeout)?;
        Ok(self.size.load(Ordering::Acquire))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current weight of `key`, if tracked.
    pub fn weight(&self, key: &K) -> Option<u64> {
        let _permit = self.gate.mutation();
        let node = self.index.get(key)?;
        let guard = self.arena.lock(node.slot());
        if guard.is_live(node.generation()) {
            guard.weight()
        } else {
            None
        }
    }

    /// `true` if `key` is tracked. May be stale by the time it returns.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains(key)
    }

    /// Key the next first-seen key will be spliced in front of.
    pub fn insertion_point(&self) -> Option<K> {
        let _permit = self.gate.snapshot();
        let ip = SlotId::new(self.insertion_point.load(Ordering::Acquire));
        self.arena.lock(ip).key().cloned()
    }

    /// Number of index shards.
    pub fn index_shards(&self) -> usize {
        self.index.shard_count()
    }

    /// Walks the list under the snapshot permit and cross-checks it against
    /// the index, the size counter and the insertion point.
    pub fn check_invariants(&self) -> Result<(), InvariantError>
    where
        K: Debug,
    {
        let _permit = self.gate.snapshot();
        let size = self.size.load(Ordering::Acquire);
        let ip = SlotId::new(self.insertion_point.load(Ordering::Acquire));

        let mut count = 0usize;
        let mut prev = TOP;
        let mut last_weight = u64::MAX;
        let mut saw_insertion_point = ip == BOTTOM;
        let mut current = self.arena.lock(TOP).next;
        while current != BOTTOM {
            let node = self.arena.lock(current);
            if node.prev != prev {
                return Err(InvariantError::new(format!(
                    "node {:?} has prev {:?}, expected {:?}",
                    node.key, node.prev, prev
                )));
            }
            let weight = node.weight().ok_or_else(|| {
                InvariantError::new(format!("tombstone at {:?} reachable from TOP", current))
            })?;
            if weight > last_weight {
                return Err(InvariantError::new(format!(
                    "weight {} of {:?} exceeds predecessor weight {}",
                    weight, node.key, last_weight
                )));
            }
            let key = node
                .key()
                .ok_or_else(|| InvariantError::new(format!("keyless node at {:?}", current)))?;
            let expected = NodeRef::new(current, node.generation);
            if self.index.get(key) != Some(expected) {
                return Err(InvariantError::new(format!(
                    "index does not map {:?} to {:?}",
                    key, expected
                )));
            }
            saw_insertion_point |= current == ip;
            last_weight = weight;
            prev = current;
            current = node.next;
            count += 1;
            if count > size {
                return Err(InvariantError::new(format!(
                    "list longer than size counter {}",
                    size
                )));
            }
        }

        if self.arena.lock(BOTTOM).prev != prev {
            return Err(InvariantError::new("BOTTOM.prev does not close the list"));
        }
        let indexed = self.index.len();
        if count != size || indexed != size {
            return Err(InvariantError::new(format!(
                "list holds {}, size counter {}, index {}",
                count, size, indexed
            )));
        }
        if size > self.capacity {
            return Err(InvariantError::new(format!(
                "len {} exceeds capacity {}",
                size, self.capacity
            )));
        }
        if !saw_insertion_point {
            return Err(InvariantError::new(format!(
                "insertion point {:?} is not in the list",
                ip
            )));
        }
        if (ip == BOTTOM) != (count == 0) {
            return Err(InvariantError::new(
                "insertion point is BOTTOM but the list is not empty",
            ));
        }
        Ok(())
    }
}

impl<K> Debug for ConcurrentRanking<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentRanking")
            .field("capacity", &self.capacity)
            .field("size", &self.size.load(Ordering::Relaxed))
            .field("arena", &self.arena)
            .finish_non_exhaustive()
    }
}

impl<K> ConcurrentFrequencyRanking<K> for ConcurrentRanking<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn register(&self, key: K) {
        ConcurrentRanking::register(self, key);
    }

    fn top(&self, count: usize) -> Vec<K> {
        ConcurrentRanking::top(self, count)
    }

    fn statistics(&self, count: usize) -> Statistics<K> {
        ConcurrentRanking::statistics(self, count)
    }

    fn len(&self) -> usize {
        ConcurrentRanking::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K> FrequencyRanking<K> for ConcurrentRanking<K>
where
    K: Eq + Hash + Clone,
{
    fn register(&mut self, key: K) {
        ConcurrentRanking::register(self, key);
    }

    fn top(&self, count: usize) -> Vec<K> {
        ConcurrentRanking::top(self, count)
    }

    fn statistics(&self, count: usize) -> Statistics<K> {
        ConcurrentRanking::statistics(self, count)
    }

    fn len(&self) -> usize {
        ConcurrentRanking::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(feature = "metrics")]
impl<K> ConcurrentRanking<K>
where
    K: Eq + Hash + Clone,
{
    /// Counter snapshot. `len` is read without the gate and may be stale.
    pub fn metrics_snapshot(&self) -> RankingMetricsSnapshot {
        self.metrics
            .snapshot(self.size.load(Ordering::Relaxed), self.capacity)
    }
}

#[cfg(feature = "metrics")]
impl<K> MetricsSnapshotProvider<RankingMetricsSnapshot> for ConcurrentRanking<K>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> RankingMetricsSnapshot {
        self.metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<K> MetricsReset for ConcurrentRanking<K> {
    fn reset_metrics(&self) {
        self.metrics.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::sequential::SequentialRanking;

    fn weights(ranking: &ConcurrentRanking<&'static str>) -> Vec<(&'static str, u64)> {
        ranking.statistics(ranking.capacity()).into_iter().collect()
    }

    mod basic_behavior {
        use super::*;

        #[test]
        fn empty_ranking() {
            let ranking: ConcurrentRanking<u32> = ConcurrentRanking::new(3);
            assert!(ranking.is_empty());
            assert!(ranking.top(3).is_empty());
            assert_eq!(ranking.insertion_point(), None);
            ranking.check_invariants().unwrap();
        }

        #[test]
        fn invalid_configuration_is_rejected() {
            assert!(ConcurrentRanking::<u32>::try_new(0).is_err());
            let err = ConcurrentRanking::<u32>::with_options(4, 0, 0, true).unwrap_err();
            assert_eq!(err, ConfigError::ZeroIndexShards);
        }

        #[test]
        fn scenario_from_a_b_a_a_c() {
            let ranking = ConcurrentRanking::new(7);
            for key in ["A", "B", "A", "A", "C"] {
                ranking.register(key);
            }
            assert_eq!(weights(&ranking), vec![("A", 3), ("C", 1), ("B", 1)]);
            assert_eq!(ranking.insertion_point(), Some("C"));
            ranking.check_invariants().unwrap();
        }

        #[test]
        fn capacity_two_evicts_oldest_lowest() {
            let ranking = ConcurrentRanking::new(2);
            for key in ["X", "Y", "Z"] {
                ranking.register(key);
            }
            assert_eq!(ranking.len(), 2);
            assert!(!ranking.contains(&"X"));
            assert_eq!(weights(&ranking), vec![("Z", 1), ("Y", 1)]);
            ranking.check_invariants().unwrap();
        }

        #[test]
        fn weight_lookup_tracks_promotions() {
            let ranking = ConcurrentRanking::new(4);
            ranking.register(9u64);
            ranking.register(9u64);
            assert_eq!(ranking.weight(&9), Some(2));
            assert_eq!(ranking.weight(&1), None);
        }

        #[test]
        fn evicted_slots_are_recycled() {
            let ranking = ConcurrentRanking::with_options(2, 1, 0, false).unwrap();
            for key in 0u32..50 {
                ranking.register(key);
            }
            // two live nodes, one spare slot cycling through the free list
            assert_eq!(ranking.arena.slot_count(), 2 + 3);
            assert_eq!(ranking.top(2), vec![49, 48]);
            ranking.check_invariants().unwrap();
        }
    }

    mod races {
        use super::*;

        #[test]
        fn stale_reference_to_evicted_node_is_dropped() {
            let ranking = ConcurrentRanking::new(1);
            ranking.register("a");
            let stale = ranking.index.get(&"a").unwrap();

            ranking.register("b");
            assert!(!ranking.contains(&"a"));
            assert!(!ranking.promote(stale));
            assert_eq!(weights(&ranking), vec![("b", 1)]);
        }

        #[test]
        fn stale_reference_to_recycled_slot_is_dropped() {
            let ranking = ConcurrentRanking::new(1);
            ranking.register("a");
            let stale = ranking.index.get(&"a").unwrap();
            ranking.register("b");
            ranking.register("c");

            let fresh = ranking.index.get(&"c").unwrap();
            assert_eq!(fresh.slot(), stale.slot());
            assert_ne!(fresh.generation(), stale.generation());

            assert!(!ranking.promote(stale));
            assert_eq!(ranking.weight(&"c"), Some(1));
        }

        #[test]
        fn lost_create_race_promotes_winner() {
            let ranking = ConcurrentRanking::new(4);
            let _permit = ranking.gate.mutation();

            // Simulate a second creator that probed the index before "k"
            // was published.
            let (loser, guard) = ranking.arena.alloc("k");
            ranking.register_admitted("k");
            let winner = ranking.index.insert_if_absent("k", loser).unwrap_err();
            let mut guard = guard;
            guard.tombstone();
            drop(guard);
            ranking.arena.release(loser.slot());
            assert!(ranking.promote(winner));
            drop(_permit);

            assert_eq!(ranking.weight(&"k"), Some(2));
            assert_eq!(ranking.arena.free_count(), 1);
            ranking.check_invariants().unwrap();
        }
    }

    mod gate {
        use super::*;

        #[test]
        fn timed_operations_give_up_while_snapshot_is_held() {
            let ranking = ConcurrentRanking::new(4);
            ranking.register(1u8);

            let permit = ranking.gate.snapshot();
            let wait = Duration::from_millis(5);
            let err = ranking.try_register_for(2, wait).unwrap_err();
            assert_eq!(err.waited(), wait);
            assert!(ranking.try_top_for(4, wait).is_err());
            assert!(ranking.try_statistics_for(4, wait).is_err());
            assert!(ranking.try_len_for(wait).is_err());
            drop(permit);

            assert_eq!(ranking.try_len_for(wait), Ok(1));
            assert!(!ranking.contains(&2));
            ranking.try_register_for(2, wait).unwrap();
            assert_eq!(ranking.try_top_for(4, wait).unwrap(), vec![2, 1]);
            assert_eq!(ranking.try_statistics_for(1, wait).unwrap().len(), 1);
        }
    }

    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn counters_track_register_paths() {
            let ranking = ConcurrentRanking::new(2);
            for key in ["a", "b", "a", "c"] {
                ranking.register(key);
            }
            let _ = ranking.top(2);
            let snapshot = ranking.metrics_snapshot();
            assert_eq!(snapshot.register_calls, 4);
            assert_eq!(snapshot.inserted, 3);
            assert_eq!(snapshot.promoted, 1);
            assert_eq!(snapshot.promote_steps, 1);
            assert_eq!(snapshot.evicted, 1);
            assert_eq!(snapshot.snapshot_reads, 1);
            assert_eq!(snapshot.len, 2);

            ranking.reset_metrics();
            assert_eq!(ranking.metrics_snapshot().register_calls, 0);
        }

        #[test]
        fn tombstone_abort_is_counted() {
            let ranking = ConcurrentRanking::new(1);
            ranking.register("a");
            let stale = ranking.index.get(&"a").unwrap();
            ranking.register("b");
            ranking.promote(stale);
            assert_eq!(ranking.metrics_snapshot().lost_increments(), 1);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Single-threaded, the concurrent engine matches the sequential
            /// one step for step.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_matches_sequential_engine(
                capacity in 1usize..12,
                keys in prop::collection::vec(0u8..24, 0..250)
            ) {
                let mut sequential = SequentialRanking::new(capacity);
                let concurrent = ConcurrentRanking::new(capacity);
                for key in keys {
                    sequential.register(key);
                    concurrent.register(key);
                    prop_assert_eq!(
                        concurrent.insertion_point(),
                        sequential.insertion_point().copied()
                    );
                }
                let concurrent_stats: Vec<_> = concurrent.statistics(capacity).into_iter().collect();
                let sequential_stats: Vec<_> = sequential.statistics(capacity).into_iter().collect();
                prop_assert_eq!(concurrent_stats, sequential_stats);
                prop_assert_eq!(concurrent.len(), sequential.len());
                prop_assert!(concurrent.check_invariants().is_ok());
            }
        }
    }
}
