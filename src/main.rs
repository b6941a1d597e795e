//! Storefront Offline - caching proxy in front of a storefront
//!
//! Serves pages, images and catalog data from versioned caches when the
//! upstream is unreachable.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_offline::intercept::Interceptor;
use storefront_offline::tasks::{spawn_cleanup_task, spawn_probe_task, spawn_reconnect_sync_task};
use storefront_offline::{api::create_router, AppState, Config};

/// Main entry point for the offline caching proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the application state (cache, partitions, interceptor, stores)
/// 4. Run the install and activate lifecycle events
/// 5. Start background sweep, probe and reconnect tasks
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_offline=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting storefront offline proxy");

    let config = Config::from_env();
    info!(
        "Configuration loaded: upstream={}, version={}, port={}, kv_max_entries={}, ttl={}s",
        config.upstream_url,
        config.cache_version,
        config.server_port,
        config.kv_max_entries,
        config.snapshot_ttl_secs
    );

    let state = AppState::from_config(&config).context("failed to build application state")?;

    state.interceptor.on_install().await;
    state.interceptor.on_activate().await;

    let tasks = vec![
        spawn_cleanup_task(state.cache.clone(), config.cleanup_interval),
        spawn_probe_task(
            state.fetcher.clone(),
            state.connectivity.clone(),
            state.interceptor.config().resolve("/"),
            Duration::from_secs(config.probe_interval),
        ),
        spawn_reconnect_sync_task(state.connectivity.clone(), state.products.clone()),
    ];
    info!("Background tasks started");

    // Warm the catalog; an unreachable upstream just leaves it empty.
    let warmup = state.products.sync(false).await;
    if let Some(error) = warmup.error {
        warn!(error = %error, "Initial catalog sync failed");
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Proxy listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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

    for task in &tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
