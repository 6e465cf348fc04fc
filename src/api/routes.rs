//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cleanup_handler, clear_handler, health_handler, keys_handler, partition_stats_handler,
    stats_handler, warm_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Statistics for every partition
/// - `GET /stats/:partition` - Statistics for one partition
/// - `GET /keys/:partition` - Resident keys of one partition
/// - `POST /warm` - Run a warm pass now
/// - `POST /cleanup` - Sweep expired entries from every partition
/// - `DELETE /cache/:partition` - Clear one partition
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/stats/:partition", get(partition_stats_handler))
        .route("/keys/:partition", get(keys_handler))
        .route("/warm", post(warm_handler))
        .route("/cleanup", post(cleanup_handler))
        .route("/cache/:partition", delete(clear_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
