//! landkit server entry point.
//!
//! Starts the Axum HTTP server with the REST API and the public pages.

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use landkit::app_state::AppState;
use landkit::config::{AppConfig, LogFormat};
use landkit::persistence::ProjectStore;
use landkit::persistence::memory::MemoryStore;
use landkit::persistence::postgres::PostgresStore;
use landkit::service::event_log;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting landkit");

    // Build persistence layer
    let store: Arc<dyn ProjectStore> = if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("failed to connect to PostgreSQL")?;
        tracing::info!("using PostgreSQL store");
        Arc::new(store)
    } else {
        tracing::info!("using in-memory store");
        Arc::new(MemoryStore::new())
    };

    // Build application state
    let request_timeout = config.request_timeout();
    let listen_addr = config.listen_addr;
    let app_state = AppState::new(config, store);
    app_state
        .media
        .init()
        .await
        .context("failed to prepare media directory")?;
    let _event_log = event_log::spawn(&app_state.event_bus, Arc::clone(&app_state.store));

    // Build router
    let app = landkit::router(app_state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
