//! Configuration Module
//!
//! Handles loading and managing cache configuration, with optional overrides
//! from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be overridden via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of items the cache can hold
    pub capacity: usize,
    /// Idle time after which an item expires
    pub ttl: Duration,
    /// Whether the periodic diagnostic dump task runs
    pub enable_periodic_dump: bool,
    /// Interval between diagnostic dumps
    pub dump_interval: Duration,
}

impl Config {
    /// Creates a new Config from defaults plus environment overrides.
    ///
    /// # Environment Variables
    /// - `TTL_CACHE_CAPACITY` - Maximum items (default: 1000, negative clamps to 0)
    /// - `TTL_CACHE_TTL_MS` - TTL in milliseconds (default: 300000, negative clamps to 0)
    /// - `TTL_CACHE_DUMP` - Enable periodic dump (default: false)
    /// - `TTL_CACHE_DUMP_INTERVAL_MS` - Dump interval in milliseconds (default: 60000)
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment overrides on top of `self`.
    ///
    /// Missing or unparseable variables keep the current value.
    pub fn with_env_overrides(self) -> Self {
        Self {
            capacity: env_non_negative("TTL_CACHE_CAPACITY")
                .map(|v| v as usize)
                .unwrap_or(self.capacity),
            ttl: env_non_negative("TTL_CACHE_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(self.ttl),
            enable_periodic_dump: env::var("TTL_CACHE_DUMP")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(self.enable_periodic_dump),
            dump_interval: env::var("TTL_CACHE_DUMP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(self.dump_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(300),
            enable_periodic_dump: false,
            dump_interval: Duration::from_secs(60),
        }
    }
}

/// Reads a signed integer and clamps negatives to zero.
fn env_non_negative(name: &str) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(clamp_non_negative)
}

fn clamp_non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
