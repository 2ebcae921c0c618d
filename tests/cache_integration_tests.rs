//! Integration Tests for the Cache
//!
//! Drives the public API through full insert / expire / evict cycles on a
//! paused Tokio clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use ttl_cache::{Cache, CacheError, Config, EvictReason};

// == Helper Functions ==

type Evictions = Arc<Mutex<Vec<(String, String, EvictReason)>>>;

fn create_test_cache(capacity: usize, ttl: Duration) -> (Cache<String, String>, Evictions) {
    let evictions: Evictions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evictions);
    let cache = Cache::builder()
        .capacity(capacity)
        .ttl(ttl)
        .on_evicted(move |key: String, value: String, reason| {
            sink.lock().unwrap().push((key, value, reason));
        })
        .build()
        .unwrap();
    (cache, evictions)
}

fn entry(key: &str, value: &str, reason: EvictReason) -> (String, String, EvictReason) {
    (key.to_string(), value.to_string(), reason)
}

fn sorted(evictions: &Evictions) -> Vec<(String, String, EvictReason)> {
    let mut list = evictions.lock().unwrap().clone();
    list.sort_by(|a, b| a.0.cmp(&b.0));
    list
}

// == Expiration ==

#[tokio::test(start_paused = true)]
async fn test_items_expire_after_ttl() {
    let (cache, evictions) = create_test_cache(2, Duration::from_secs(1));

    cache.set("1".to_string(), "a".to_string());
    cache.set("2".to_string(), "b".to_string());
    assert_eq!(cache.count(), 2);

    sleep(Duration::from_secs(2)).await;

    assert_eq!(cache.count(), 0);
    assert_eq!(
        sorted(&evictions),
        vec![
            entry("1", "a", EvictReason::Expired),
            entry("2", "b", EvictReason::Expired),
        ]
    );
    cache.close().await;
}

// == Capacity ==

#[tokio::test(start_paused = true)]
async fn test_out_of_capacity_then_expired() {
    let (cache, evictions) = create_test_cache(2, Duration::from_secs(1));

    cache.set("1".to_string(), "a".to_string());
    cache.set("2".to_string(), "b".to_string());
    cache.set("3".to_string(), "c".to_string());

    // "1" leaves before "3" becomes visible
    assert_eq!(
        *evictions.lock().unwrap(),
        vec![entry("1", "a", EvictReason::OutOfCapacity)]
    );
    assert_eq!(cache.count(), 2);
    assert_eq!(cache.get("1"), None);

    sleep(Duration::from_secs(2)).await;

    assert_eq!(cache.count(), 0);
    assert_eq!(
        sorted(&evictions),
        vec![
            entry("1", "a", EvictReason::OutOfCapacity),
            entry("2", "b", EvictReason::Expired),
            entry("3", "c", EvictReason::Expired),
        ]
    );
    cache.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_zero_capacity_holds_nothing() {
    let config = Config {
        capacity: 0,
        ttl: Duration::from_secs(1),
        ..Config::default()
    };
    let evictions: Evictions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evictions);
    let cache: Cache<String, String> = Cache::builder()
        .config(config)
        .on_evicted(move |key: String, value: String, reason| {
            sink.lock().unwrap().push((key, value, reason));
        })
        .build()
        .unwrap();

    cache.set("1".to_string(), "a".to_string());
    cache.set("2".to_string(), "b".to_string());

    assert_eq!(cache.count(), 0);
    assert_eq!(cache.get("1"), None);
    assert_eq!(
        *evictions.lock().unwrap(),
        vec![
            entry("1", "a", EvictReason::OutOfCapacity),
            entry("2", "b", EvictReason::OutOfCapacity),
        ]
    );
    cache.close().await;
}

// == Sliding TTL ==

#[tokio::test(start_paused = true)]
async fn test_overwrite_refreshes_ttl() {
    let (cache, evictions) = create_test_cache(2, Duration::from_secs(2));

    cache.set("1".to_string(), "a".to_string());
    cache.set("2".to_string(), "b".to_string());
    assert_eq!(cache.count(), 2);

    sleep(Duration::from_secs(1)).await;
    cache.set("1".to_string(), "aa".to_string());

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get("1"), Some("aa".to_string()));
    assert_eq!(cache.count(), 1);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(cache.count(), 0);
    assert_eq!(
        sorted(&evictions),
        vec![
            entry("1", "aa", EvictReason::Expired),
            entry("2", "b", EvictReason::Expired),
        ]
    );
    cache.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_get_refreshes_ttl() {
    let (cache, _evictions) = create_test_cache(2, Duration::from_secs(2));

    cache.set("1".to_string(), "a".to_string());
    cache.set("2".to_string(), "b".to_string());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(cache.get("1"), Some("a".to_string()));

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.count(), 1);

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.count(), 0);
    cache.close().await;
}

// == Lookups and Removal ==

#[tokio::test(start_paused = true)]
async fn test_get_missing_key() {
    let (cache, evictions) = create_test_cache(2, Duration::from_secs(2));

    assert_eq!(cache.get("missing"), None);
    assert_eq!(cache.count(), 0);
    assert!(evictions.lock().unwrap().is_empty());
    cache.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_remove_fires_removed_once() {
    let (cache, evictions) = create_test_cache(2, Duration::from_secs(1));

    cache.set("1".to_string(), "a".to_string());
    cache.remove("1");
    assert_eq!(cache.count(), 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(
        *evictions.lock().unwrap(),
        vec![entry("1", "a", EvictReason::Removed)]
    );
    cache.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_remove_absent_key_is_noop() {
    let (cache, evictions) = create_test_cache(2, Duration::from_secs(1));

    assert!(!cache.remove("nil key"));
    cache.set("1".to_string(), "a".to_string());
    cache.set("2".to_string(), "b".to_string());
    assert!(!cache.remove("nil key"));
    assert_eq!(cache.count(), 2);
    assert!(evictions.lock().unwrap().is_empty());

    cache.remove("1");
    assert_eq!(cache.count(), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(cache.count(), 0);
    assert_eq!(
        sorted(&evictions),
        vec![
            entry("1", "a", EvictReason::Removed),
            entry("2", "b", EvictReason::Expired),
        ]
    );
    cache.close().await;
}

// == Construction ==

#[test]
fn test_build_outside_runtime_fails() {
    let result = Cache::<String, String>::new(Config::default());
    assert!(matches!(result, Err(CacheError::NoRuntime(_))));
}

#[tokio::test]
async fn test_unknown_reason_label() {
    assert_eq!(EvictReason::label(2), "OutOfCapacity");
    assert_eq!(EvictReason::label(200), "Unknown");
    assert!(matches!(
        EvictReason::try_from(200u8),
        Err(CacheError::UnknownReason(200))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_writers() {
    let cache = Arc::new(
        Cache::<u32, u32>::builder()
            .capacity(64)
            .ttl(Duration::from_secs(1))
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..4u32)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..100u32 {
                    cache.set(worker * 1000 + i, i);
                    cache.get(&(worker * 1000 + i / 2));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.count(), 64);
    assert_eq!(cache.stats().out_of_capacity, 400 - 64);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(cache.count(), 0);
}
