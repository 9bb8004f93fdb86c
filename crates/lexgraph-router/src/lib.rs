//! Lexgraph Router
//!
//! HTTP front end of the conflict-of-interest engine. Serves snapshots,
//! findings, risk, path explanations and advisory predictions to the
//! dashboard layer as JSON. All endpoints are read-only.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::RouterConfig;
use handlers::{create_router, AppState};
use lexgraph_engine::ConflictEngine;
use lexgraph_predict::HttpPredictor;
use lexgraph_store::{SqliteCaseStore, StoreError};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Router error
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Case store could not be opened
    #[error("Failed to open case store: {0}")]
    Store(#[from] StoreError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Initialize the global tracing subscriber
///
/// Honors `RUST_LOG`; defaults to `info`. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Start the Router HTTP server
///
/// Validates configuration, opens the case store, builds the engine and
/// starts the axum server.
pub async fn start_server(config: RouterConfig) -> Result<(), RouterError> {
    init_tracing();
    config.validate()?;

    info!("Starting Lexgraph Router");
    info!("Bind address: {}", config.bind_addr());
    info!("Case database: {}", config.database_path);
    info!("Predictor endpoint: {}", config.prediction.endpoint);
    info!(
        cache_capacity = config.engine.cache_capacity,
        max_nodes = config.engine.max_nodes,
        max_edges = config.engine.max_edges,
        request_timeout_secs = config.request_timeout_secs,
        "Engine configured"
    );

    let store = Arc::new(SqliteCaseStore::new(&config.database_path)?);
    let predictor = Arc::new(
        HttpPredictor::new(config.prediction.endpoint.clone()).with_timeout(config.prediction.timeout()),
    );
    let engine = Arc::new(ConflictEngine::new(store, predictor, config.engine.clone()));

    let app = create_router(AppState::new(engine, config.request_timeout()));

    // Bind and serve
    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Router listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| RouterError::Server(e.to_string()))?;

    Ok(())
}
