//! Cache Dump Task
//!
//! Background task that periodically hands a snapshot of every stored pair
//! to a diagnostic sink.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheSnapshot, DumpSink, Shared};

/// Spawns the periodic dump task.
///
/// The snapshot is taken under the read lock; the sink runs after the lock
/// is released, so a slow sink never stalls cache operations.
pub(crate) fn spawn_dump_task<K, V>(
    runtime: &Handle,
    shared: Arc<Shared<K, V>>,
    interval: Duration,
    sink: DumpSink<K, V>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    runtime.spawn(async move {
        info!("Starting cache dump task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately; wait a full interval before dumping
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = CacheSnapshot::capture(&shared);
                    sink(&snapshot);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Cache dump task stopped");
    })
}
