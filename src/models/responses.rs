//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheHandle;
use crate::marketplace::Partition;
use crate::tasks::{CleanupReport, WarmReport, WarmRun};

/// Statistics for one cache partition (GET /stats/:partition)
#[derive(Debug, Clone, Serialize)]
pub struct PartitionStatsResponse {
    pub partition: Partition,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Current number of entries in the partition
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub capacity: usize,
    pub default_ttl_secs: u64,
}

impl PartitionStatsResponse {
    /// Snapshot of `cache`'s counters and settings
    pub fn new(partition: Partition, cache: &dyn CacheHandle) -> Self {
        let stats = cache.stats();
        Self {
            partition,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            capacity: cache.capacity(),
            default_ttl_secs: cache.default_ttl().as_secs(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct AllStatsResponse {
    pub partitions: Vec<PartitionStatsResponse>,
    /// Most recent completed warm pass
    pub last_warm: Option<WarmRun>,
}

/// Resident keys of one partition (GET /keys/:partition)
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub partition: Partition,
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    /// Sorts `keys` so the listing is stable
    pub fn new(partition: Partition, mut keys: Vec<String>) -> Self {
        keys.sort_unstable();
        Self {
            partition,
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for a manual warm (POST /warm)
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WarmResponse {
    Completed { report: WarmReport },
    /// Another warm pass was already running
    Skipped,
}

impl From<Option<WarmReport>> for WarmResponse {
    fn from(report: Option<WarmReport>) -> Self {
        match report {
            Some(report) => WarmResponse::Completed { report },
            None => WarmResponse::Skipped,
        }
    }
}

/// Response body for a manual cleanup (POST /cleanup)
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub total_removed: usize,
    #[serde(flatten)]
    pub report: CleanupReport,
}

impl From<CleanupReport> for CleanupResponse {
    fn from(report: CleanupReport) -> Self {
        Self {
            total_removed: report.total(),
            report,
        }
    }
}

/// Response body for clearing a partition (DELETE /cache/:partition)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    pub partition: Partition,
    /// Entries dropped by the clear
    pub cleared: usize,
}

impl ClearResponse {
    pub fn new(partition: Partition, cleared: usize) -> Self {
        Self {
            message: format!("Partition '{}' cleared", partition),
            partition,
            cleared,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
