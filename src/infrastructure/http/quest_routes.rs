//! Quest API routes
//!
//! Read-only views of the running quest for dashboards and reconnecting
//! clients. Everything that changes the game goes through the WebSocket.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::application::services::{EntityView, KnownSets, PlayerView, QuestSummary};
use crate::domain::events::TurnSnapshot;
use crate::domain::services::ArchivedTurn;
use crate::infrastructure::state::AppState;

pub async fn get_quest(State(state): State<Arc<AppState>>) -> Json<QuestSummary> {
    Json(state.quest.summary())
}

pub async fn get_turn(State(state): State<Arc<AppState>>) -> Json<TurnSnapshot> {
    Json(state.quest.turn_snapshot())
}

/// Regions, doors and blocking walls the party has discovered
pub async fn get_known(State(state): State<Arc<AppState>>) -> Json<KnownSets> {
    Json(state.quest.known_sets())
}

pub async fn list_entities(State(state): State<Arc<AppState>>) -> Json<Vec<EntityView>> {
    Json(state.quest.visible_entities())
}

pub async fn list_players(State(state): State<Arc<AppState>>) -> Json<Vec<PlayerView>> {
    Json(state.quest.players())
}

/// Movement segments of every finished hero turn
pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<Vec<ArchivedTurn>> {
    Json(state.quest.movement_history())
}

/// Quest files available in the quest directory
pub async fn list_quests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    state
        .quests
        .list_quests()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
