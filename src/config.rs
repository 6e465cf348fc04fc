//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::marketplace::{Partition, PartitionSettings};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Seconds between scheduled warm and cleanup passes
    pub refresh_interval: u64,
    /// Run a warm pass before accepting requests
    pub warm_on_startup: bool,
    /// Simulated latency of the in-memory backing store, in milliseconds
    pub source_latency_ms: u64,
    /// Capacity and TTL per cache partition
    pub partitions: BTreeMap<Partition, PartitionSettings>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `REFRESH_INTERVAL` - Refresh frequency in seconds (default: 300)
    /// - `WARM_ON_STARTUP` - Warm caches before serving (default: true)
    /// - `SOURCE_LATENCY_MS` - Simulated backing store latency (default: 25)
    /// - `<PARTITION>_MAX_ENTRIES` - Partition capacity, e.g. `STALLS_MAX_ENTRIES`
    /// - `<PARTITION>_TTL` - Partition default TTL in seconds, e.g. `ORDERS_TTL`
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let partitions = Partition::ALL
            .into_iter()
            .map(|partition| {
                let prefix = partition.as_str().to_ascii_uppercase();
                let fallback = partition.default_settings();
                let settings = PartitionSettings {
                    capacity: parse(&lookup, &format!("{prefix}_MAX_ENTRIES"))
                        .unwrap_or(fallback.capacity),
                    ttl: parse(&lookup, &format!("{prefix}_TTL"))
                        .map(Duration::from_secs)
                        .unwrap_or(fallback.ttl),
                };
                (partition, settings)
            })
            .collect();

        Self {
            server_port: parse(&lookup, "SERVER_PORT").unwrap_or(defaults.server_port),
            refresh_interval: parse(&lookup, "REFRESH_INTERVAL")
                .unwrap_or(defaults.refresh_interval),
            warm_on_startup: parse(&lookup, "WARM_ON_STARTUP").unwrap_or(defaults.warm_on_startup),
            source_latency_ms: parse(&lookup, "SOURCE_LATENCY_MS")
                .unwrap_or(defaults.source_latency_ms),
            partitions,
        }
    }

    /// Settings for `partition`, falling back to its compiled-in defaults.
    pub fn partition(&self, partition: Partition) -> PartitionSettings {
        self.partitions
            .get(&partition)
            .copied()
            .unwrap_or_else(|| partition.default_settings())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn source_latency(&self) -> Duration {
        Duration::from_millis(self.source_latency_ms)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            refresh_interval: 300,
            warm_on_startup: true,
            source_latency_ms: 25,
            partitions: Partition::ALL
                .into_iter()
                .map(|partition| (partition, partition.default_settings()))
                .collect(),
        }
    }
}
