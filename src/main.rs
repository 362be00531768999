//! video-ad-tracker server entry point.
//!
//! Starts the Axum HTTP server, the click ingest workers and the backlog
//! reconcile sweep, and drains queued clicks on shutdown.

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use video_ad_tracker::api;
use video_ad_tracker::app_state::AppState;
use video_ad_tracker::config::{LogFormat, TrackerConfig};
use video_ad_tracker::metrics::TrackerMetrics;
use video_ad_tracker::persistence::{EventStore, MemoryEventStore, PostgresEventStore};
use video_ad_tracker::service::BacklogReconciler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = TrackerConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    init_tracing(&config);
    tracing::info!(addr = %config.listen_addr, "starting video-ad-tracker");

    // Build persistence layer
    let store = open_store(&config).await?;

    // Build service layer
    let metrics = Arc::new(TrackerMetrics::new().context("failed to register metrics")?);
    let reconciler = BacklogReconciler::new(
        Arc::clone(&store),
        Arc::clone(&metrics),
        config.reconcile_batch_size,
    );
    let sweep = config
        .reconcile_interval()
        .map(|every| reconciler.clone().spawn_sweep(every));

    // Build application state
    let (app_state, workers) = AppState::new(store, reconciler, metrics, &config);

    // Build router
    let app = api::build_app(app_state)
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and every ingest handle it held) is gone; drain the queue.
    if let Some(sweep) = sweep {
        sweep.abort();
    }
    tracing::info!("draining click queue");
    workers.join().await;
    tracing::info!("shutdown complete");

    Ok(())
}

fn init_tracing(config: &TrackerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn open_store(config: &TrackerConfig) -> anyhow::Result<Arc<dyn EventStore>> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled, using in-memory store");
        let store = MemoryEventStore::new();
        if config.seed_sample_ads {
            let seeded = store.seed_sample_ads().await;
            tracing::info!(seeded, "sample ads seeded");
        }
        return Ok(Arc::new(store));
    }

    let store = PostgresEventStore::connect(config)
        .await
        .context("failed to connect to PostgreSQL")?;
    store.migrate().await.context("failed to run migrations")?;
    tracing::info!("database migrations applied");
    if config.seed_sample_ads {
        let seeded = store.seed_sample_ads().await?;
        tracing::info!(seeded, "sample ads seeded");
    }
    Ok(Arc::new(store))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
