//! TTL Cache - An in-memory key-value cache with sliding expiration
//!
//! Items expire after a configurable idle period; inserting into a full
//! cache evicts the item closest to expiring. Each cache runs its own
//! background scheduler that wakes exactly at the next deadline.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{Cache, CacheBuilder, CacheSnapshot, CacheStats, EvictReason};
pub use config::Config;
pub use error::{CacheError, Result};
