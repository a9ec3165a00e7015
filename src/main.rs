//! Dungeon Engine - Authoritative server for a turn-based dungeon crawl
//!
//! The Engine is the single source of truth for a running quest:
//! - Decides whose turn it is and what they may still do
//! - Validates and applies hero and monster movement
//! - Resolves combat dice
//! - Tracks what the party has discovered (fog of war)
//! - Pushes every change to connected clients over WebSocket

mod application;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::http;
use crate::infrastructure::session::event_fanout_worker;
use crate::infrastructure::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dungeon_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Dungeon Engine");

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Quest dir: {}", config.quest_dir.display());
    tracing::info!("  Quest: {}", config.quest_name.as_deref().unwrap_or("demo (built-in)"));
    tracing::info!("  Turn order: {:?}", config.turn_order);
    if config.debug_tools {
        tracing::warn!("  Debug tools are enabled");
    }

    // Load the quest; a broken quest is fatal
    let (state, events) = match AppState::new(config).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to start quest: {:#}", e);
            return Err(e);
        }
    };
    let state = Arc::new(state);
    tracing::info!("Quest '{}' loaded", state.quest.name());

    let fanout_worker = tokio::spawn(event_fanout_worker(events, state.sessions.clone()));

    // Build the router
    let port = state.config.server_port;
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(infrastructure::websocket::ws_handler))
        // Merge REST API routes
        .merge(http::create_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping...");
        }
    }

    fanout_worker.abort();
    tracing::info!("Dungeon Engine stopped");
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
