//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::error::Result;
use crate::marketplace::{MarketplaceCaches, Partition};
use crate::models::{
    AllStatsResponse, CleanupResponse, ClearResponse, HealthResponse, KeysResponse,
    PartitionStatsResponse, WarmResponse,
};
use crate::tasks::CacheWarmer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Every partition store
    pub caches: Arc<MarketplaceCaches>,
    /// Warmer driving the same stores
    pub warmer: Arc<CacheWarmer>,
}

impl AppState {
    /// Creates a new AppState serving the stores `warmer` keeps warm.
    pub fn new(warmer: Arc<CacheWarmer>) -> Self {
        Self {
            caches: Arc::clone(warmer.caches()),
            warmer,
        }
    }
}

/// Handler for GET /stats
///
/// Returns statistics for every partition and the last warm pass.
pub async fn stats_handler(State(state): State<AppState>) -> Json<AllStatsResponse> {
    let partitions = state
        .caches
        .handles()
        .map(|(partition, cache)| PartitionStatsResponse::new(partition, cache))
        .collect();

    Json(AllStatsResponse {
        partitions,
        last_warm: state.warmer.last_run(),
    })
}

/// Handler for GET /stats/:partition
pub async fn partition_stats_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PartitionStatsResponse>> {
    let partition: Partition = name.parse()?;
    let cache = state.caches.handle(partition);

    Ok(Json(PartitionStatsResponse::new(partition, cache)))
}

/// Handler for GET /keys/:partition
pub async fn keys_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<KeysResponse>> {
    let partition: Partition = name.parse()?;
    let keys = state.caches.handle(partition).keys();

    Ok(Json(KeysResponse::new(partition, keys)))
}

/// Handler for POST /warm
///
/// Runs a warm pass unless one is already in progress.
pub async fn warm_handler(State(state): State<AppState>) -> Json<WarmResponse> {
    Json(state.warmer.warm_cache().await.into())
}

/// Handler for POST /cleanup
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    Json(state.warmer.cleanup().into())
}

/// Handler for DELETE /cache/:partition
///
/// Drops every entry of one partition. Statistics are kept.
pub async fn clear_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClearResponse>> {
    let partition: Partition = name.parse()?;
    let cache = state.caches.handle(partition);

    let cleared = cache.len();
    cache.clear();
    info!(partition = %partition, cleared, "Partition cleared");

    Ok(Json(ClearResponse::new(partition, cleared)))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::marketplace::InMemorySource;

    fn test_state() -> AppState {
        let caches = Arc::new(MarketplaceCaches::with_defaults());
        let source = Arc::new(InMemorySource::seeded());
        AppState::new(Arc::new(CacheWarmer::new(caches, source)))
    }

    #[tokio::test]
    async fn test_warm_then_stats() {
        let state = test_state();

        let Json(warm) = warm_handler(State(state.clone())).await;
        assert!(matches!(warm, WarmResponse::Completed { .. }));

        let Json(stats) = stats_handler(State(state)).await;
        assert_eq!(stats.partitions.len(), 5);
        assert_eq!(stats.partitions[0].partition, Partition::Stalls);
        assert_eq!(stats.partitions[0].total_entries, 4);
        assert!(stats.last_warm.is_some());
    }

    #[tokio::test]
    async fn test_partition_stats_unknown() {
        let state = test_state();

        let result = partition_stats_handler(State(state), Path("pizzas".to_string())).await;

        assert!(matches!(result, Err(ApiError::UnknownPartition(_))));
    }

    #[tokio::test]
    async fn test_keys_and_clear() {
        let state = test_state();
        state.warmer.warm_cache().await;

        let Json(keys) = keys_handler(State(state.clone()), Path("businesses".to_string()))
            .await
            .unwrap();
        assert_eq!(keys.keys, vec!["business:1", "business:2", "businesses:active"]);

        let Json(cleared) = clear_handler(State(state.clone()), Path("businesses".to_string()))
            .await
            .unwrap();
        assert_eq!(cleared.cleared, 3);
        assert!(state.caches.businesses.is_empty());
        assert_eq!(state.caches.stalls.len(), 4);
    }

    #[tokio::test]
    async fn test_cleanup_handler_counts() {
        let state = test_state();

        let Json(resp) = cleanup_handler(State(state)).await;

        assert_eq!(resp.total_removed, 0);
        assert_eq!(resp.report.removed.len(), 5);
    }
}
