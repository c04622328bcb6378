//! Debate floor - procedural state engine for committee sessions
//!
//! Serves speaker queues, the motion log and the display board for
//! committees in session over HTTP.

mod api;
mod config;
mod db;
mod floor;

use api::{create_router, AppState, BearerTokenGate};
use config::FloorConfig;
use db::Database;
use floor::FloorEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debate_floor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = FloorConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path, config.busy_timeout)?;

    if config.admin_token.is_none() {
        tracing::warn!("FLOOR_ADMIN_TOKEN not set; motion routes are open to every caller");
    }

    let engine = FloorEngine::new(db, config.session_defaults.clone());
    let gate = Arc::new(BearerTokenGate::new(config.admin_token.clone()));
    let state = AppState::new(engine, gate);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state).layer(cors).layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Debate floor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
