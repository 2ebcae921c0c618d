//! Cache Handle Module
//!
//! Thread-safe public cache. Wraps the store in a single reader/writer lock
//! and owns the background tasks that expire items and dump snapshots.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cache::{
    noop_evict_callback, CacheStats, CacheStore, EvictCallback, EvictReason, SetOutcome,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_dump_task, spawn_expiration_task};

/// Receives every periodic snapshot when the diagnostic dump is enabled.
pub type DumpSink<K, V> = Arc<dyn Fn(&CacheSnapshot<K, V>) + Send + Sync>;

// == Cache Snapshot ==
/// Point-in-time copy of every stored pair, expired or not.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot<K, V> {
    /// Wall-clock time the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Stored pairs in queue order
    pub entries: Vec<(K, V)>,
}

impl<K, V> CacheSnapshot<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn capture(shared: &Shared<K, V>) -> Self {
        let entries = shared.read().store.snapshot();
        Self {
            taken_at: Utc::now(),
            entries,
        }
    }
}

/// Default sink: one log line per stored pair.
fn log_dump_sink<K: fmt::Debug, V: fmt::Debug>() -> DumpSink<K, V> {
    Arc::new(|snapshot: &CacheSnapshot<K, V>| {
        info!("Cache dump: {} items", snapshot.entries.len());
        for (key, value) in &snapshot.entries {
            info!("key[{:?}], value[{:?}]", key, value);
        }
    })
}

// == Shared State ==
/// Everything guarded by the cache lock.
pub(crate) struct CacheState<K, V> {
    pub(crate) store: CacheStore<K, V>,
    /// True while a wake is pending or the scheduler timer is armed
    pub(crate) wake_pending: bool,
}

/// State shared between the handle and its background tasks.
pub(crate) struct Shared<K, V> {
    state: RwLock<CacheState<K, V>>,
    /// Single stored permit; repeated notifications coalesce
    pub(crate) wake: Notify,
}

impl<K, V> Shared<K, V> {
    // A panicking eviction callback poisons the lock; the store itself is
    // still consistent at that point, so keep serving.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, CacheState<K, V>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, CacheState<K, V>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Cache ==
/// In-memory key-value cache with sliding TTL and a capacity bound.
///
/// Every instance owns a background scheduler that sleeps until the
/// soonest deadline and reaps whatever has expired. Operations are
/// synchronous and only ever wait for the lock.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use ttl_cache::Cache;
///
/// #[tokio::main]
/// async fn main() -> ttl_cache::Result<()> {
///     let cache = Cache::builder()
///         .capacity(2)
///         .ttl(Duration::from_secs(3))
///         .on_evicted(|key: String, value: String, reason| {
///             println!("{} {} {}", reason, key, value);
///         })
///         .build()?;
///
///     cache.set("key1".to_string(), "value1".to_string());
///     assert_eq!(cache.get("key1"), Some("value1".to_string()));
///
///     cache.close().await;
///     Ok(())
/// }
/// ```
pub struct Cache<K, V> {
    shared: Arc<Shared<K, V>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.read();
        f.debug_struct("Cache")
            .field("count", &state.store.len())
            .field("capacity", &state.store.capacity())
            .field("ttl", &state.store.ttl())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Creates a cache from `config` with a no-op eviction callback.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        CacheBuilder::new().config(config).build()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// Overwriting a live key refreshes its deadline. Inserting into a full
    /// cache first evicts the soonest-expiring item with
    /// `EvictReason::OutOfCapacity`.
    pub fn set(&self, key: K, value: V) {
        let wake = {
            let mut state = self.shared.write();
            let outcome = state.store.set(key, value, Instant::now());
            outcome == SetOutcome::Inserted && !std::mem::replace(&mut state.wake_pending, true)
        };

        if wake {
            self.shared.wake.notify_one();
        }
    }

    // == Get ==
    /// Returns a copy of the value if the key is live, sliding its deadline.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.write().store.get(key, Instant::now())
    }

    // == Remove ==
    /// Removes a key, reporting it with `EvictReason::Removed`.
    ///
    /// Returns false if the key was absent; no callback fires then.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.write().store.remove(key)
    }

    /// Number of stored items, including expired ones not yet reaped.
    pub fn count(&self) -> usize {
        self.shared.read().store.len()
    }

    /// Creation time of the soonest-expiring item, None when empty.
    pub fn oldest_time(&self) -> Option<Instant> {
        self.shared.read().store.oldest_time()
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.read().store.stats()
    }

    /// Copies every stored pair, expired or not.
    pub fn snapshot(&self) -> CacheSnapshot<K, V> {
        CacheSnapshot::capture(&self.shared)
    }

    pub fn capacity(&self) -> usize {
        self.shared.read().store.capacity()
    }

    pub fn ttl(&self) -> Duration {
        self.shared.read().store.ttl()
    }

    // == Close ==
    /// Stops the background tasks and waits for them to finish.
    ///
    /// Pending deadlines are abandoned; no callbacks fire for items still
    /// stored.
    pub async fn close(mut self) {
        let _ = self.shutdown_tx.send(true);
        for task in std::mem::take(&mut self.tasks) {
            if let Err(err) = task.await {
                warn!("Cache background task ended abnormally: {}", err);
            }
        }
        info!("Cache closed");
    }
}

impl<K, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        // Signal the background tasks to stop when the cache is dropped
        let _ = self.shutdown_tx.send(true);
    }
}

// == Cache Builder ==
/// Configures and creates a [`Cache`].
pub struct CacheBuilder<K, V> {
    config: Config,
    on_evicted: Option<EvictCallback<K, V>>,
    dump_sink: Option<DumpSink<K, V>>,
}

impl<K, V> Default for CacheBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheBuilder<K, V> {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            on_evicted: None,
            dump_sink: None,
        }
    }

    /// Replaces every configuration value at once.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Sets the callback run for every eviction, under the cache lock.
    pub fn on_evicted<F>(mut self, callback: F) -> Self
    where
        F: Fn(K, V, EvictReason) + Send + Sync + 'static,
    {
        self.on_evicted = Some(Arc::new(callback));
        self
    }

    /// Enables the diagnostic dump every `interval`.
    pub fn periodic_dump(mut self, interval: Duration) -> Self {
        self.config.enable_periodic_dump = true;
        self.config.dump_interval = interval;
        self
    }

    /// Replaces the default logging sink of the diagnostic dump.
    pub fn dump_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&CacheSnapshot<K, V>) + Send + Sync + 'static,
    {
        self.dump_sink = Some(Arc::new(sink));
        self
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Creates the cache and starts its background tasks.
    ///
    /// # Errors
    /// - `CacheError::NoRuntime` outside of a Tokio runtime
    /// - `CacheError::InvalidConfig` if the dump is enabled with a zero interval
    pub fn build(self) -> Result<Cache<K, V>> {
        let runtime = Handle::try_current().map_err(|e| CacheError::NoRuntime(e.to_string()))?;

        let Config {
            capacity,
            ttl,
            enable_periodic_dump,
            dump_interval,
        } = self.config;

        if enable_periodic_dump && dump_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "dump interval must be non-zero".to_string(),
            ));
        }

        let on_evicted = self.on_evicted.unwrap_or_else(noop_evict_callback);
        let shared = Arc::new(Shared {
            state: RwLock::new(CacheState {
                store: CacheStore::new(capacity, ttl, on_evicted),
                wake_pending: false,
            }),
            wake: Notify::new(),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = vec![spawn_expiration_task(
            &runtime,
            Arc::clone(&shared),
            shutdown_rx.clone(),
        )];

        if enable_periodic_dump {
            let sink = self.dump_sink.unwrap_or_else(log_dump_sink);
            tasks.push(spawn_dump_task(
                &runtime,
                Arc::clone(&shared),
                dump_interval,
                sink,
                shutdown_rx,
            ));
        }

        info!(
            "Cache created: capacity={}, ttl={:?}, periodic_dump={}",
            capacity, ttl, enable_periodic_dump
        );

        Ok(Cache {
            shared,
            shutdown_tx,
            tasks,
        })
    }
}
