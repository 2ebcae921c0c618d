//! Expiration Queue Module
//!
//! Binary min-heap of cache items ordered by `expires_at`, with O(log n)
//! removal and re-seating of arbitrary items.

use crate::cache::item::{CacheItem, NOT_QUEUED};

/// Handle to an item stored in an [`ExpirationQueue`].
///
/// Stays valid until the item leaves the queue; the slot is then recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(usize);

// == Expiration Queue ==
/// Tracks expiration order for cache items.
///
/// Items live in a slot arena; the heap holds slot ids where:
/// - `heap[0]` = soonest to expire
/// - every parent expires no later than its children
#[derive(Debug)]
pub struct ExpirationQueue<K, V> {
    /// Slot ids in heap order
    heap: Vec<ItemId>,
    /// Item storage indexed by `ItemId`
    slots: Vec<Option<CacheItem<K, V>>>,
    /// Vacated slots available for reuse
    vacant: Vec<usize>,
}

impl<K, V> Default for ExpirationQueue<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ExpirationQueue<K, V> {
    // == Constructor ==
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            slots: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Creates an empty queue with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            vacant: Vec::new(),
        }
    }

    // == Push ==
    /// Adds an item and returns its handle.
    pub fn push(&mut self, mut item: CacheItem<K, V>) -> ItemId {
        let pos = self.heap.len();
        item.heap_index = pos;

        let id = match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot] = Some(item);
                ItemId(slot)
            }
            None => {
                self.slots.push(Some(item));
                ItemId(self.slots.len() - 1)
            }
        };

        self.heap.push(id);
        self.sift_up(pos);
        id
    }

    // == Pop Min ==
    /// Removes and returns the soonest-expiring item.
    ///
    /// Returns None if the queue is empty.
    pub fn pop_min(&mut self) -> Option<CacheItem<K, V>> {
        let id = *self.heap.first()?;
        self.remove(id)
    }

    // == Remove ==
    /// Removes an arbitrary queued item by handle.
    ///
    /// The item must currently be queued; a stale handle is a logic error and
    /// yields None.
    pub fn remove(&mut self, id: ItemId) -> Option<CacheItem<K, V>> {
        let pos = self.position(id);
        debug_assert!(pos.is_some(), "remove called with a stale item id");
        let pos = pos?;

        let last = self.heap.len() - 1;
        if pos != last {
            self.swap(pos, last);
        }
        self.heap.pop();

        let mut item = self.slots[id.0].take()?;
        self.vacant.push(id.0);
        item.heap_index = NOT_QUEUED;

        if pos < self.heap.len() {
            self.fix(pos);
        }
        Some(item)
    }

    // == Update ==
    /// Restores heap order after the item's `expires_at` changed.
    pub fn update(&mut self, id: ItemId) {
        let pos = self.position(id);
        debug_assert!(pos.is_some(), "update called with a stale item id");
        if let Some(pos) = pos {
            self.fix(pos);
        }
    }

    // == Peek Min ==
    /// Returns the soonest-expiring item without removing it.
    pub fn peek_min(&self) -> Option<&CacheItem<K, V>> {
        self.heap.first().and_then(|&id| self.get(id))
    }

    /// Returns the handle of the soonest-expiring item.
    pub fn peek_min_id(&self) -> Option<ItemId> {
        self.heap.first().copied()
    }

    pub fn get(&self, id: ItemId) -> Option<&CacheItem<K, V>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable access to a queued item.
    ///
    /// Changing `expires_at` through this reference requires a following
    /// `update(id)`.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut CacheItem<K, V>> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    // == Iteration ==
    /// Iterates queued items in heap order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = &CacheItem<K, V>> + '_ {
        self.heap.iter().filter_map(move |&id| self.get(id))
    }

    // == Length ==
    /// Returns the number of queued items.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    // == Heap Internals ==
    fn position(&self, id: ItemId) -> Option<usize> {
        let pos = self.get(id)?.heap_index;
        (self.heap.get(pos) == Some(&id)).then_some(pos)
    }

    fn expires_at(&self, pos: usize) -> tokio::time::Instant {
        // heap entries always point at occupied slots
        match &self.slots[self.heap[pos].0] {
            Some(item) => item.expires_at(),
            None => unreachable!("heap references a vacant slot"),
        }
    }

    fn less(&self, i: usize, j: usize) -> bool {
        self.expires_at(i) < self.expires_at(j)
    }

    /// Swaps two heap positions and rewrites both items' `heap_index`.
    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        for pos in [i, j] {
            let id = self.heap[pos];
            if let Some(item) = self.slots[id.0].as_mut() {
                item.heap_index = pos;
            }
        }
    }

    fn sift_up(&mut self, mut pos: usize) -> bool {
        let start = pos;
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
        pos != start
    }

    fn sift_down(&mut self, mut pos: usize) -> bool {
        let start = pos;
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, pos) {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
        pos != start
    }

    /// Re-seats the item at `pos` in whichever direction restores order.
    fn fix(&mut self, pos: usize) {
        if !self.sift_down(pos) {
            self.sift_up(pos);
        }
    }

    /// Asserts heap order and back-reference consistency.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        for (pos, &id) in self.heap.iter().enumerate() {
            let item = self.get(id).expect("heap references a vacant slot");
            assert_eq!(item.heap_index, pos, "stale heap_index");
            if pos > 0 {
                let parent = (pos - 1) / 2;
                assert!(
                    self.expires_at(parent) <= self.expires_at(pos),
                    "heap order violated at position {}",
                    pos
                );
            }
        }
        let occupied = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(occupied, self.heap.len(), "orphaned slot");
    }
}
