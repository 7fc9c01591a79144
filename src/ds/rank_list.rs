//! Weight-ordered doubly linked list with sentinels, backed by `SlotArena`.
//!
//! This is the shared data model of every ranking engine: nodes carry a key
//! and a weight, and are linked by [`SlotId`] between two sentinels that
//! never carry a key.
//!
//! ## Architecture
//!
//! ```text
//!   arena (SlotArena<RankNode<K>>)
//!   ┌────────┬───────────────────────────────────────────────────────────┐
//!   │ SlotId │ RankNode { key, state, prev, next }                       │
//!   ├────────┼───────────────────────────────────────────────────────────┤
//!   │ 0      │ { key: None,    Active(u64::MAX), prev: -,  next: 3 }     │  TOP
//!   │ 1      │ { key: None,    Active(1),        prev: 2,  next: - }     │  BOTTOM
//!   │ 2      │ { key: Some(B), Active(1),        prev: 3,  next: 1 }     │
//!   │ 3      │ { key: Some(A), Active(3),        prev: 0,  next: 2 }     │
//!   └────────┴───────────────────────────────────────────────────────────┘
//!
//!   TOP ─► [A:3] ◄──► [B:1] ◄── BOTTOM
//! ```
//!
//! Weights are non-increasing from `TOP` to `BOTTOM`. Bottom's weight is
//! pinned at 1: it is the weight a first-seen key inherits when the list is
//! empty.
//!
//! ## Operations
//! - `splice_before(id, anchor)`: link a detached node immediately before `anchor`
//! - `unlink(id)`: detach a node and heal its neighbours
//! - `free(id)`: release a detached node's slot, returning its key
//!
//! The list does not enforce ordering itself; engines decide where nodes go.
//! [`link_between`] and [`heal`] are the same primitives expressed on
//! individually borrowed nodes, for callers that hold one lock per node.

use crate::ds::slot_arena::{SlotArena, SlotId};

/// Head sentinel. Always slot 0.
pub const TOP: SlotId = SlotId::new(0);
/// Tail sentinel. Always slot 1.
pub const BOTTOM: SlotId = SlotId::new(1);
/// Link value of a node that is not in any list.
pub const DETACHED: SlotId = SlotId::new(usize::MAX);

/// Weight carried by the bottom sentinel.
pub const BOTTOM_WEIGHT: u64 = 1;

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Linked (or about to be linked) with the given occurrence count.
    Active { weight: u64 },
    /// Evicted. Any operation still holding a reference must treat the node
    /// as absent.
    Tombstoned,
}

/// A list node.
#[derive(Debug)]
pub struct RankNode<K> {
    pub(crate) key: Option<K>,
    pub(crate) state: NodeState,
    /// Bumped every time a concurrent arena slot is recycled; stays 0 in
    /// the sequential list.
    pub(crate) generation: u64,
    pub(crate) prev: SlotId,
    pub(crate) next: SlotId,
}

impl<K> RankNode<K> {
    pub(crate) fn top() -> Self {
        Self {
            key: None,
            state: NodeState::Active { weight: u64::MAX },
            generation: 0,
            prev: DETACHED,
            next: BOTTOM,
        }
    }

    pub(crate) fn bottom() -> Self {
        Self {
            key: None,
            state: NodeState::Active {
                weight: BOTTOM_WEIGHT,
            },
            generation: 0,
            prev: TOP,
            next: DETACHED,
        }
    }

    /// An unused arena slot.
    pub(crate) fn vacant() -> Self {
        Self {
            key: None,
            state: NodeState::Tombstoned,
            generation: 0,
            prev: DETACHED,
            next: DETACHED,
        }
    }

    /// A keyed node that is not linked yet. Its weight is assigned on splice.
    pub(crate) fn detached(key: K) -> Self {
        Self {
            key: Some(key),
            state: NodeState::Active { weight: 0 },
            generation: 0,
            prev: DETACHED,
            next: DETACHED,
        }
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// Current weight, or `None` for a tombstone.
    #[inline]
    pub fn weight(&self) -> Option<u64> {
        match self.state {
            NodeState::Active { weight } => Some(weight),
            NodeState::Tombstoned => None,
        }
    }

    /// Weight used for ordering comparisons; tombstones compare lowest.
    #[inline]
    pub(crate) fn rank(&self) -> u64 {
        self.weight().unwrap_or(0)
    }

    #[inline]
    pub fn is_tombstoned(&self) -> bool {
        self.state == NodeState::Tombstoned
    }

    /// `true` if this is still the active incarnation `generation` of its slot.
    #[inline]
    pub(crate) fn is_live(&self, generation: u64) -> bool {
        self.generation == generation && !self.is_tombstoned()
    }

    #[inline]
    pub(crate) fn set_weight(&mut self, weight: u64) {
        self.state = NodeState::Active { weight };
    }

    /// Adds one occurrence and returns the new weight. No-op on tombstones.
    #[inline]
    pub(crate) fn increment(&mut self) -> Option<u64> {
        match &mut self.state {
            NodeState::Active { weight } => {
                *weight += 1;
                Some(*weight)
            },
            NodeState::Tombstoned => None,
        }
    }

    /// Marks the node inert, clears its links and hands back its key.
    pub(crate) fn tombstone(&mut self) -> Option<K> {
        self.state = NodeState::Tombstoned;
        self.prev = DETACHED;
        self.next = DETACHED;
        self.key.take()
    }
}

/// Links `node` (stored at `id`) between `prev` and `next`, which must be
/// adjacent.
pub(crate) fn link_between<K>(
    id: SlotId,
    node: &mut RankNode<K>,
    prev_id: SlotId,
    prev: &mut RankNode<K>,
    next_id: SlotId,
    next: &mut RankNode<K>,
) {
    debug_assert_eq!(prev.next, next_id);
    debug_assert_eq!(next.prev, prev_id);
    node.prev = prev_id;
    node.next = next_id;
    prev.next = id;
    next.prev = id;
}

/// Makes `prev` and `next` adjacent, dropping whatever sat between them.
pub(crate) fn heal<K>(
    prev_id: SlotId,
    prev: &mut RankNode<K>,
    next_id: SlotId,
    next: &mut RankNode<K>,
) {
    prev.next = next_id;
    next.prev = prev_id;
}

/// Sentinel-anchored list used by the sequential engine.
#[derive(Debug)]
pub struct RankList<K> {
    arena: SlotArena<RankNode<K>>,
}

impl<K> RankList<K> {
    /// Creates an empty list (`TOP.next == BOTTOM`, `BOTTOM.prev == TOP`).
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` keyed nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut arena = SlotArena::with_capacity(capacity.saturating_add(2));
        let top = arena.insert(RankNode::top());
        let bottom = arena.insert(RankNode::bottom());
        debug_assert_eq!((top, bottom), (TOP, BOTTOM));
        Self { arena }
    }

    /// Number of keyed nodes (linked or detached).
    pub fn len(&self) -> usize {
        self.arena.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, id: SlotId) -> Option<&RankNode<K>> {
        self.arena.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: SlotId) -> Option<&mut RankNode<K>> {
        self.arena.get_mut(id)
    }

    pub fn next(&self, id: SlotId) -> Option<SlotId> {
        self.node(id).map(|node| node.next)
    }

    pub fn prev(&self, id: SlotId) -> Option<SlotId> {
        self.node(id).map(|node| node.prev)
    }

    /// Weight of `id`; sentinels report `u64::MAX` (top) and `1` (bottom).
    pub fn weight(&self, id: SlotId) -> Option<u64> {
        self.node(id).and_then(RankNode::weight)
    }

    /// Allocates a detached node for `key`.
    pub fn alloc(&mut self, key: K) -> SlotId {
        self.arena.insert(RankNode::detached(key))
    }

    /// Links the detached node `id` immediately before `anchor`.
    ///
    /// Returns `None` if either slot is free or `anchor` is `TOP`.
    pub fn splice_before(&mut self, id: SlotId, anchor: SlotId) -> Option<()> {
        if anchor == TOP {
            return None;
        }
        let prev = self.node(anchor)?.prev;
        {
            let node = self.node_mut(id)?;
            node.prev = prev;
            node.next = anchor;
        }
        self.node_mut(prev)?.next = id;
        self.node_mut(anchor)?.prev = id;
        Some(())
    }

    /// Detaches `id` and joins its former neighbours.
    pub fn unlink(&mut self, id: SlotId) -> Option<()> {
        if id == TOP || id == BOTTOM {
            return None;
        }
        let (prev, next) = {
            let node = self.node(id)?;
            (node.prev, node.next)
        };
        self.node_mut(prev)?.next = next;
        self.node_mut(next)?.prev = prev;
        let node = self.node_mut(id)?;
        node.prev = DETACHED;
        node.next = DETACHED;
        Some(())
    }

    /// Frees a detached node's slot and returns its key.
    pub fn free(&mut self, id: SlotId) -> Option<K> {
        if id == TOP || id == BOTTOM {
            return None;
        }
        self.arena.remove(id).and_then(|mut node| node.key.take())
    }

    /// Iterates `(key, weight)` from the heaviest node down.
    pub fn iter(&self) -> RankListIter<'_, K> {
        RankListIter {
            list: self,
            current: self.next(TOP).unwrap_or(BOTTOM),
        }
    }
}

impl<K> Default for RankList<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(key, weight)` pairs in list order.
pub struct RankListIter<'a, K> {
    list: &'a RankList<K>,
    current: SlotId,
}

impl<'a, K> Iterator for RankListIter<'a, K> {
    type Item = (&'a K, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == BOTTOM {
            return None;
        }
        let node = self.list.node(self.current)?;
        self.current = node.next;
        Some((node.key.as_ref()?, node.rank()))
    }
}
