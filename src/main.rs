//! warmcache server
//!
//! Builds the cache chain from the environment and serves the admin API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warmcache::api::{create_router, AppState};
use warmcache::cache::{CacheFactory, CacheMonitor};
use warmcache::config::ProductionConfig;
use warmcache::tasks::{spawn_stats_reporter, CacheWarmer};

/// # Startup Sequence
/// 1. Initialize tracing
/// 2. Load and validate configuration
/// 3. Build backend, monitoring and security layers
/// 4. Start the warmer and stats reporter
/// 5. Serve until SIGINT/SIGTERM, then drain the warmer and close the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warmcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting warmcache");

    let config = ProductionConfig::from_env();
    let report = config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: backend={}, policy={}, max_items={}, default_ttl={}s, port={}, warnings={}",
        config.high_availability.backend,
        config.performance.eviction_policy,
        config.performance.max_items,
        config.performance.default_ttl,
        config.server.port,
        report.warnings.len()
    );

    let monitor = Arc::new(CacheMonitor::new());
    let cache = CacheFactory::build(&config, monitor.clone())
        .await
        .context("failed to build cache")?;

    let shutdown = CancellationToken::new();

    let warmer = Arc::new(CacheWarmer::new(cache.clone(), config.to_warmer_config()));
    if config.monitoring.enabled {
        warmer.set_monitor(monitor.clone());
    }
    register_status_job(&warmer);
    warmer.start(&shutdown)?;

    let reporter = (config.monitoring.enabled && config.monitoring.log_interval > 0).then(|| {
        spawn_stats_reporter(
            monitor.clone(),
            Duration::from_secs(config.monitoring.log_interval),
            shutdown.clone(),
        )
    });

    let state = AppState::new(cache.clone(), monitor, warmer.clone(), config.default_ttl());
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("server error")?;

    warmer.stop().await;
    if let Some(reporter) = reporter {
        let _ = reporter.await;
    }
    cache.close().await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Keeps `system:status` warm so probes can read it without touching
/// any loader of their own.
fn register_status_job(warmer: &CacheWarmer) {
    let started_at = chrono::Utc::now();
    warmer.add_warming_job(
        "system:status",
        move || async move {
            Ok(serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "started_at": started_at.to_rfc3339(),
                "refreshed_at": chrono::Utc::now().to_rfc3339(),
            }))
        },
        Duration::from_secs(60),
        Duration::from_secs(180),
    );
}

/// Waits for Ctrl+C or SIGTERM, then cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
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
                error!("Failed to install SIGTERM handler: {}", err);
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

    shutdown.cancel();
}
