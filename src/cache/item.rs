//! Cache Item Module
//!
//! Defines a single cache item with sliding TTL and its slot in the
//! expiration queue.

use std::time::Duration;

use tokio::time::Instant;

/// `heap_index` value of an item that is not currently queued.
pub const NOT_QUEUED: usize = usize::MAX;

/// Stand-in deadline for TTLs that overflow `Instant`, about 30 years out.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE)
}

// == Cache Item ==
/// Represents a single cache item with value and expiration metadata.
#[derive(Debug, Clone)]
pub struct CacheItem<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    ttl: Duration,
    created_at: Instant,
    expires_at: Instant,
    /// Position in the queue's heap; written only by the queue
    pub(crate) heap_index: usize,
}

impl<K, V> CacheItem<K, V> {
    // == Constructor ==
    /// Creates a new item that expires `ttl` after `now`.
    pub fn new_at(key: K, value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            key,
            value,
            ttl,
            created_at: now,
            expires_at: deadline(now, ttl),
            heap_index: NOT_QUEUED,
        }
    }

    // == Touch ==
    /// Pushes the deadline out to `now + ttl`.
    ///
    /// If the item is queued, the owner must call `ExpirationQueue::update`
    /// afterwards to restore heap order.
    pub fn touch_at(&mut self, now: Instant) {
        self.expires_at = deadline(now, self.ttl);
    }

    // == Is Expired ==
    /// Checks if the item has expired at `now`.
    ///
    /// Boundary condition: the deadline instant itself counts as expired, so
    /// a timer that fires exactly at `expires_at` always reaps the item.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the time left before expiry, zero once expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Returns true while the item sits in an expiration queue.
    pub fn is_queued(&self) -> bool {
        self.heap_index != NOT_QUEUED
    }
}
