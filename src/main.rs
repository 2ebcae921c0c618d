//! TTL Cache demo
//!
//! Walks a small cache through insertion, capacity eviction and expiry
//! while logging every eviction and the periodic cache dump.

use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_cache::{Cache, Config};

/// Main entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration (demo defaults, overridable from the environment)
/// 3. Create the cache with a logging eviction callback
/// 4. Replay the insert / wait script, or stop early on Ctrl+C
/// 5. Print final statistics and close the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_cache=info,ttl_cache_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config {
        capacity: 2,
        ttl: Duration::from_secs(3),
        enable_periodic_dump: true,
        dump_interval: Duration::from_secs(1),
    }
    .with_env_overrides();
    info!(
        "Configuration loaded: capacity={}, ttl={:?}, periodic_dump={}, dump_interval={:?}",
        config.capacity, config.ttl, config.enable_periodic_dump, config.dump_interval
    );

    let cache: Cache<String, String> = Cache::builder()
        .config(config)
        .on_evicted(|key: String, value: String, reason| {
            info!("Evicted ({}): key[{}], value[{}]", reason, key, value);
        })
        .build()
        .context("failed to create cache")?;

    tokio::select! {
        _ = run_script(&cache) => {
            info!("Demo script finished");
        }
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C, stopping early");
        }
    }

    let stats = cache.stats();
    info!(
        "Final stats: {}",
        serde_json::to_string(&stats).context("failed to serialize stats")?
    );

    cache.close().await;
    Ok(())
}

async fn run_script(cache: &Cache<String, String>) {
    cache.set("key1".to_string(), "value1".to_string());
    tokio::time::sleep(Duration::from_secs(2)).await;

    cache.set("key2".to_string(), "value2".to_string());
    tokio::time::sleep(Duration::from_secs(2)).await;

    // With capacity 2 the second insert evicts the soonest-expiring item
    cache.set("key3".to_string(), "value3".to_string());
    cache.set("key4".to_string(), "value4".to_string());
    info!("Items stored: {}", cache.count());

    tokio::time::sleep(Duration::from_secs(4)).await;
}
