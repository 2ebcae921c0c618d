//! Cache Statistics Module
//!
//! Lookup outcomes and eviction counts, split by eviction reason.

use serde::Serialize;

use crate::cache::EvictReason;

/// Counters kept by the store and copied out on `Cache::stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// `get` calls that found a live item
    pub hits: u64,
    /// `get` calls that found nothing or an expired item
    pub misses: u64,
    pub removed: u64,
    pub expired: u64,
    pub out_of_capacity: u64,
    /// Items stored when the counters were read, expired or not
    pub total_entries: usize,
}

impl CacheStats {
    pub(crate) fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub(crate) fn record_eviction(&mut self, reason: EvictReason) {
        let counter = match reason {
            EvictReason::Removed => &mut self.removed,
            EvictReason::Expired => &mut self.expired,
            EvictReason::OutOfCapacity => &mut self.out_of_capacity,
        };
        *counter += 1;
    }

    /// Number of evictions recorded for `reason`.
    pub fn evicted(&self, reason: EvictReason) -> u64 {
        match reason {
            EvictReason::Removed => self.removed,
            EvictReason::Expired => self.expired,
            EvictReason::OutOfCapacity => self.out_of_capacity,
        }
    }

    /// Evictions across all reasons.
    pub fn evictions(&self) -> u64 {
        self.removed + self.expired + self.out_of_capacity
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups that hit; 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let stats = CacheStats::default();
        assert_eq!(stats.lookups(), 0);
        assert_eq!(stats.evictions(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_lookups_feed_hit_rate() {
        let mut stats = CacheStats::default();
        for hit in [true, false, true, true] {
            stats.record_lookup(hit);
        }
        assert_eq!((stats.hits, stats.misses), (3, 1));
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_evictions_split_by_reason() {
        let mut stats = CacheStats::default();
        stats.record_eviction(EvictReason::Expired);
        stats.record_eviction(EvictReason::Expired);
        stats.record_eviction(EvictReason::OutOfCapacity);

        assert_eq!(stats.evicted(EvictReason::Expired), 2);
        assert_eq!(stats.evicted(EvictReason::OutOfCapacity), 1);
        assert_eq!(stats.evicted(EvictReason::Removed), 0);
        assert_eq!(stats.evictions(), 3);
    }

    #[test]
    fn test_serializes_reason_counters() {
        let mut stats = CacheStats::default();
        stats.record_eviction(EvictReason::Removed);
        stats.total_entries = 7;

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["removed"], 1);
        assert_eq!(json["total_entries"], 7);
    }
}
