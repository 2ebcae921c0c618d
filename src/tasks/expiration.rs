//! TTL Expiration Task
//!
//! Background scheduler that sleeps until the soonest deadline in the
//! expiration queue, reaps every expired item, and re-arms for the next one.

use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant, Sleep};
use tracing::{debug, info, trace};

use crate::cache::Shared;

/// Spawns the expiration scheduler for one cache instance.
///
/// The task waits on three events:
/// - the timer reaching the current root's `expires_at`: reap under the
///   write lock (eviction callbacks run there), then re-arm or go idle
/// - a wake from `set` after a brand-new insertion: re-read the root and
///   re-arm, since the timer may be idle
/// - the shutdown flag: exit without touching remaining items
///
/// Whenever the queue turns out empty the scheduler clears `wake_pending`
/// under the lock, so the next insertion signals it again.
///
/// # Returns
/// A JoinHandle for the spawned task, awaited by `Cache::close`.
pub(crate) fn spawn_expiration_task<K, V>(
    runtime: &Handle,
    shared: Arc<Shared<K, V>>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    runtime.spawn(run_expiration(shared, shutdown))
}

async fn run_expiration<K, V>(shared: Arc<Shared<K, V>>, mut shutdown: watch::Receiver<bool>)
where
    K: Eq + Hash + Clone,
{
    info!("Starting TTL expiration scheduler");

    let timer = sleep_until(Instant::now());
    tokio::pin!(timer);
    let mut armed = false;

    loop {
        tokio::select! {
            () = &mut timer, if armed => {
                let (reaped, next) = {
                    let mut state = shared.write();
                    let reaped = state.store.reap_expired(Instant::now());
                    let next = state.store.next_expiration();
                    if next.is_none() {
                        state.wake_pending = false;
                    }
                    (reaped, next)
                };

                if reaped > 0 {
                    debug!("TTL expiration: reaped {} expired items", reaped);
                }
                armed = rearm(timer.as_mut(), next);
            }
            () = shared.wake.notified() => {
                let next = {
                    let mut state = shared.write();
                    let next = state.store.next_expiration();
                    if next.is_none() {
                        state.wake_pending = false;
                    }
                    next
                };
                armed = rearm(timer.as_mut(), next);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("TTL expiration scheduler stopped");
}

/// Points the timer at `next`; returns false when there is nothing to wait for.
fn rearm(timer: Pin<&mut Sleep>, next: Option<Instant>) -> bool {
    match next {
        Some(deadline) => {
            trace!(
                "Next expiration in {:?}",
                deadline.saturating_duration_since(Instant::now())
            );
            timer.reset(deadline);
            true
        }
        None => {
            trace!("Expiration queue empty, scheduler idle");
            false
        }
    }
}
