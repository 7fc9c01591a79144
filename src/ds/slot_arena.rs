//! Slot arena with stable indices and slot recycling.
//!
//! Backs the sequential [`RankList`](crate::ds::RankList). Nodes address each
//! other by [`SlotId`] instead of references, so a node can be unlinked,
//! relinked, or freed without aliasing hazards. Freed slots go on a free list
//! and are handed out again by the next `insert`.
//!
//! ```text
//!   slots:     [ Some(top) | Some(bottom) | None | Some(n3) | Some(n4) ]
//!   free_list: [ 2 ]
//!                            insert(n5) ──► reuses slot 2
//! ```
//!
//! The first two inserts into a fresh arena always receive ids `0` and `1`,
//! which is how the rank list pins its sentinels.

/// Stable index of a slot in a [`SlotArena`] or a
/// [`NodeArena`](crate::ds::NodeArena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<Option<T>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Stores `value`, reusing a freed slot when one is available.
    pub fn insert(&mut self, value: T) -> SlotId {
        let idx = match self.free_list.pop() {
            Some(idx) => {
                self.slots[idx] = Some(value);
                idx
            },
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            },
        };
        self.len += 1;
        SlotId(idx)
    }

    /// Frees the slot and returns its value; `None` if already free.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let value = self.slots.get_mut(id.0)?.take()?;
        self.free_list.push(id.0);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated, occupied or free.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
