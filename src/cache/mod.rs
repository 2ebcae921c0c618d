//! Cache Module
//!
//! Provides in-memory caching with sliding TTL expiration and eviction of
//! the soonest-expiring item when full.

mod handle;
mod item;
mod queue;
mod reason;
mod stats;
mod store;


// Re-export public types
pub use handle::{Cache, CacheBuilder, CacheSnapshot, DumpSink};
pub use item::{CacheItem, NOT_QUEUED};
pub use queue::{ExpirationQueue, ItemId};
pub use reason::{EvictReason, UNKNOWN_REASON};
pub use stats::CacheStats;
pub use store::{noop_evict_callback, CacheStore, EvictCallback, SetOutcome};

pub(crate) use handle::Shared;
