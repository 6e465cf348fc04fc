//! Marketplace Cache - admin service
//!
//! Runs the partition caches and their warmer in front of the in-memory
//! backing store, and serves the admin API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketplace_cache::api::{create_router, AppState};
use marketplace_cache::marketplace::{InMemorySource, MarketplaceCaches};
use marketplace_cache::tasks::CacheWarmer;
use marketplace_cache::Config;

/// Main entry point for the marketplace cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create one cache store per partition
/// 4. Warm the catalogue partitions (unless disabled)
/// 5. Start the periodic refresh task
/// 6. Start HTTP server on configured port
/// 7. On SIGINT/SIGTERM, stop the server, then the refresh task
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketplace_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting marketplace cache service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, refresh_interval={}s, warm_on_startup={}",
        config.server_port, config.refresh_interval, config.warm_on_startup
    );

    let caches = Arc::new(MarketplaceCaches::new(|partition| {
        let settings = config.partition(partition);
        info!(
            "Partition {}: capacity={}, ttl={}s",
            partition,
            settings.capacity,
            settings.ttl.as_secs()
        );
        settings
    }));

    let source = Arc::new(InMemorySource::seeded().with_latency(config.source_latency()));
    let warmer = Arc::new(CacheWarmer::new(Arc::clone(&caches), source));

    if config.warm_on_startup {
        warmer.warm_cache().await;
    }

    let refresh = warmer.start_periodic_refresh(config.refresh_interval());

    let app = create_router(AppState::new(Arc::clone(&warmer)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    refresh.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
