//! HTTP REST API routes

mod quest_routes;
mod session_routes;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::infrastructure::state::AppState;

/// Create all API routes
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Quest routes
        .route("/api/quest", get(quest_routes::get_quest))
        .route("/api/quest/turn", get(quest_routes::get_turn))
        .route("/api/quest/known", get(quest_routes::get_known))
        .route("/api/quest/entities", get(quest_routes::list_entities))
        .route("/api/quest/players", get(quest_routes::list_players))
        .route("/api/quest/history", get(quest_routes::get_history))
        .route("/api/quests", get(quest_routes::list_quests))
        // Session routes
        .route(
            "/api/session/participants",
            get(session_routes::list_participants),
        )
}
