//! Concurrent node arena: one `parking_lot::Mutex` per slot.
//!
//! The concurrent engine never holds references into the list; it holds
//! [`SlotId`]s and locks the slot to read or change a node. "Lock a node"
//! is "lock arena slot i".
//!
//! ## Layout
//!
//! Slots live in chunks that double in size and are never moved once
//! allocated, so a `&Mutex<RankNode<K>>` handed out stays valid while other
//! threads grow the arena:
//!
//! ```text
//!   chunk 0: slots   0 ..  63   (64)     ◄── TOP = 0, BOTTOM = 1
//!   chunk 1: slots  64 .. 191   (128)
//!   chunk 2: slots 192 .. 447   (256)
//!   ...
//! ```
//!
//! ## Recycling
//!
//! Evicted slots go on a free list and are reused. Each reuse bumps the
//! slot's `generation`; the key index stores [`NodeRef`] = `(slot,
//! generation)`, so a thread holding a stale `NodeRef` sees either a
//! tombstone or a generation mismatch once it takes the slot lock, and
//! treats the node as gone.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::ds::rank_list::{BOTTOM, DETACHED, RankNode, TOP};
use crate::ds::slot_arena::SlotId;

const FIRST_CHUNK_SHIFT: u32 = 6;
const CHUNK_COUNT: usize = (usize::BITS - FIRST_CHUNK_SHIFT) as usize;

/// A slot together with the incarnation that was published for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    slot: SlotId,
    generation: u64,
}

impl NodeRef {
    #[inline]
    pub(crate) fn new(slot: SlotId, generation: u64) -> Self {
        Self { slot, generation }
    }

    #[inline]
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

type Chunk<K> = Box<[Mutex<RankNode<K>>]>;

pub struct NodeArena<K> {
    chunks: Box<[OnceLock<Chunk<K>>]>,
    fresh: AtomicUsize,
    free: Mutex<Vec<SlotId>>,
}

impl<K> NodeArena<K> {
    /// Creates an arena holding only the two sentinels, with chunks
    /// preallocated for `capacity` keyed nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        let chunks: Box<[OnceLock<Chunk<K>>]> = (0..CHUNK_COUNT).map(|_| OnceLock::new()).collect();
        let arena = Self {
            chunks,
            fresh: AtomicUsize::new(2),
            free: Mutex::new(Vec::new()),
        };
        let last = capacity.saturating_add(1);
        let (last_chunk, _) = locate(last);
        for chunk in 0..=last_chunk {
            let _ = arena.chunk(chunk);
        }
        *arena.lock(TOP) = RankNode::top();
        *arena.lock(BOTTOM) = RankNode::bottom();
        arena
    }

    fn chunk(&self, chunk: usize) -> &Chunk<K> {
        self.chunks[chunk].get_or_init(|| {
            (0..(1usize << (chunk as u32 + FIRST_CHUNK_SHIFT)))
                .map(|_| Mutex::new(RankNode::vacant()))
                .collect()
        })
    }

    #[inline]
    fn slot(&self, id: SlotId) -> &Mutex<RankNode<K>> {
        debug_assert_ne!(id, DETACHED, "attempted to lock a detached link");
        let (chunk, offset) = locate(id.index());
        &self.chunk(chunk)[offset]
    }

    /// Blocks until the node in slot `id` is locked.
    #[inline]
    pub fn lock(&self, id: SlotId) -> MutexGuard<'_, RankNode<K>> {
        self.slot(id).lock()
    }

    /// Claims a slot for a detached node carrying `key` and returns it
    /// already locked, so nobody can observe it before it is linked.
    pub fn alloc(&self, key: K) -> (NodeRef, MutexGuard<'_, RankNode<K>>) {
        let recycled = self.free.lock().pop();
        let slot =
            recycled.unwrap_or_else(|| SlotId::new(self.fresh.fetch_add(1, Ordering::Relaxed)));
        let mut guard = self.lock(slot);
        let generation = guard.generation.wrapping_add(1);
        *guard = RankNode::detached(key);
        guard.generation = generation;
        (NodeRef::new(slot, generation), guard)
    }

    /// Returns a tombstoned, unlinked and unindexed slot to the free list.
    pub fn release(&self, slot: SlotId) {
        debug_assert!(slot != TOP && slot != BOTTOM);
        self.free.lock().push(slot);
    }

    /// Number of slots ever handed out, sentinels included.
    pub fn slot_count(&self) -> usize {
        self.fresh.load(Ordering::Relaxed)
    }

    /// Number of recycled slots waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }
}

impl<K> std::fmt::Debug for NodeArena<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeArena")
            .field("slot_count", &self.slot_count())
            .field("free_count", &self.free_count())
            .finish()
    }
}

/// Maps a slot index to `(chunk, offset)`.
#[inline]
fn locate(index: usize) -> (usize, usize) {
    let biased = index + (1usize << FIRST_CHUNK_SHIFT);
    let chunk = (usize::BITS - 1 - biased.leading_zeros() - FIRST_CHUNK_SHIFT) as usize;
    (chunk, biased - (1usize << (chunk as u32 + FIRST_CHUNK_SHIFT)))
}
