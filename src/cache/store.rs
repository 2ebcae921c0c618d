//! Cache Store Module
//!
//! Main cache engine combining a key index with the expiration queue.
//!
//! The store does no locking and never reads the clock itself: every
//! time-dependent operation takes `now`. The [`Cache`](crate::cache::Cache)
//! handle wraps it in a lock and supplies the current instant.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error};

use crate::cache::{CacheItem, CacheStats, EvictReason, ExpirationQueue, ItemId};

/// Callback invoked with the key, value and reason of every evicted item.
///
/// Runs while the cache lock is held: it must not call back into the same
/// cache.
pub type EvictCallback<K, V> = Arc<dyn Fn(K, V, EvictReason) + Send + Sync>;

/// Returns a callback that ignores evictions.
pub fn noop_evict_callback<K, V>() -> EvictCallback<K, V> {
    Arc::new(|_: K, _: V, _: EvictReason| {})
}

/// What a `set` did with the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Existing live item got the new value and a fresh deadline
    Refreshed,
    /// A new item entered the cache
    Inserted,
    /// Zero capacity: the item went straight to the eviction callback
    Rejected,
}

// == Cache Store ==
/// Main cache storage with TTL ordering and capacity eviction.
pub struct CacheStore<K, V> {
    /// Key to queue slot
    index: HashMap<K, ItemId>,
    /// Items ordered by expiration
    queue: ExpirationQueue<K, V>,
    /// Maximum number of items allowed
    capacity: usize,
    /// Sliding TTL applied to every item
    ttl: Duration,
    on_evicted: EvictCallback<K, V>,
    stats: CacheStats,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CacheStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("queue", &self.queue)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity, TTL and callback.
    pub fn new(capacity: usize, ttl: Duration, on_evicted: EvictCallback<K, V>) -> Self {
        Self {
            index: HashMap::new(),
            queue: ExpirationQueue::new(),
            capacity,
            ttl,
            on_evicted,
            stats: CacheStats::default(),
        }
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// A live key keeps its slot: the value is replaced and the deadline
    /// slides to `now + ttl`. A missing or already expired key is inserted
    /// fresh, evicting the soonest-expiring items first while the cache is
    /// full.
    pub fn set(&mut self, key: K, value: V, now: Instant) -> SetOutcome {
        if let Some(id) = self.index.get(&key).copied() {
            let live = self
                .queue
                .get(id)
                .is_some_and(|item| !item.is_expired_at(now));

            if live {
                if let Some(item) = self.queue.get_mut(id) {
                    item.value = value;
                    item.touch_at(now);
                }
                self.queue.update(id);
                return SetOutcome::Refreshed;
            }

            // Expired but not reaped yet; drop it so the key maps to one item
            self.evict(id, EvictReason::Expired);
        }

        if self.capacity == 0 {
            debug!("Capacity is zero, rejecting insertion");
            self.stats.record_eviction(EvictReason::OutOfCapacity);
            (self.on_evicted)(key, value, EvictReason::OutOfCapacity);
            return SetOutcome::Rejected;
        }

        while self.index.len() >= self.capacity {
            match self.queue.peek_min_id() {
                Some(id) => self.evict(id, EvictReason::OutOfCapacity),
                None => break,
            }
        }

        let id = self
            .queue
            .push(CacheItem::new_at(key.clone(), value, self.ttl, now));
        self.index.insert(key, id);
        self.stats.total_entries = self.index.len();

        SetOutcome::Inserted
    }

    // == Get ==
    /// Retrieves a value by key and slides its deadline.
    ///
    /// Expired items read as missing but stay in place until reaped.
    pub fn get<Q>(&mut self, key: &Q, now: Instant) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let Some(&id) = self.index.get(key) else {
            self.stats.record_lookup(false);
            return None;
        };

        let value = match self.queue.get_mut(id) {
            Some(item) if !item.is_expired_at(now) => {
                item.touch_at(now);
                item.value.clone()
            }
            _ => {
                self.stats.record_lookup(false);
                return None;
            }
        };

        self.queue.update(id);
        self.stats.record_lookup(true);
        Some(value)
    }

    // == Remove ==
    /// Removes an item by key, reporting it with `EvictReason::Removed`.
    ///
    /// Returns false (and fires no callback) if the key is absent.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key).copied() {
            Some(id) => {
                self.evict(id, EvictReason::Removed);
                true
            }
            None => false,
        }
    }

    // == Reap Expired ==
    /// Evicts every item whose deadline is at or before `now`.
    ///
    /// Returns the number of items removed.
    pub fn reap_expired(&mut self, now: Instant) -> usize {
        let mut reaped = 0;
        while let Some(id) = self.queue.peek_min_id() {
            let expired = self
                .queue
                .get(id)
                .is_some_and(|item| item.is_expired_at(now));
            if !expired {
                break;
            }
            self.evict(id, EvictReason::Expired);
            reaped += 1;
        }
        reaped
    }

    /// Deadline of the soonest-expiring item.
    pub fn next_expiration(&self) -> Option<Instant> {
        self.queue.peek_min().map(CacheItem::expires_at)
    }

    /// Creation time of the soonest-expiring item.
    ///
    /// This tracks expiration order, not insertion age: a refreshed item may
    /// sort behind younger ones.
    pub fn oldest_time(&self) -> Option<Instant> {
        self.queue.peek_min().map(CacheItem::created_at)
    }

    /// Copies every stored pair, expired or not, in queue order.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.queue
            .iter()
            .map(|item| (item.key.clone(), item.value.clone()))
            .collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.index.len();
        stats
    }

    // == Length ==
    /// Returns the current number of items, including unreaped expired ones.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Takes the item out of both containers, then reports it.
    fn evict(&mut self, id: ItemId, reason: EvictReason) {
        let Some(item) = self.queue.remove(id) else {
            return;
        };
        self.index.remove(&item.key);
        self.stats.record_eviction(reason);
        self.stats.total_entries = self.index.len();

        debug!("Evicted item ({}), {} remaining", reason, self.index.len());
        // The item is already gone from both containers, so a panicking
        // callback leaves the store consistent.
        let on_evicted = &self.on_evicted;
        if panic::catch_unwind(AssertUnwindSafe(|| on_evicted(item.key, item.value, reason)))
            .is_err()
        {
            error!("Eviction callback panicked ({})", reason);
        }
    }

    /// Asserts the index and the queue hold exactly the same items.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.queue.check_invariants();
        assert_eq!(self.index.len(), self.queue.len(), "index/queue size mismatch");
        for (key, &id) in &self.index {
            let item = self.queue.get(id).expect("index points at a vacant slot");
            assert!(item.key() == key, "index points at another key's item");
        }
    }
}
