// SPDX-License-Identifier: MIT

//! CodePair API Server
//!
//! Pairs two users for a live mock coding interview: one hosts a
//! session, another joins, and both talk over the Stream video/chat
//! provider.

use codepair::{
    config::Config,
    db::Database,
    services::{SessionService, StreamService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting CodePair API");

    // Open the document store (falls back to in-memory when unconfigured)
    let db = Database::open(&config).await;
    tracing::info!(storage = db.backend_name(), "Store opened");

    // Initialize the Stream adapter
    let stream = match (&config.stream_api_key, &config.stream_api_secret) {
        (Some(key), Some(secret)) => StreamService::new(key.clone(), secret.clone()),
        _ => {
            tracing::warn!("STREAM_API_KEY/SECRET not set, Stream features are offline");
            StreamService::new_offline(String::new(), String::new())
        }
    };

    // Build shared state
    let sessions = SessionService::new(db.clone(), stream.clone());
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        stream,
        sessions,
    });

    // Build router
    let app = codepair::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codepair=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
