use axum::{extract::State, Json};
use std::sync::Arc;

use crate::infrastructure::state::AppState;
use crate::infrastructure::websocket::messages::ParticipantInfo;

/// List connected participants, one entry per user
pub async fn list_participants(State(state): State<Arc<AppState>>) -> Json<Vec<ParticipantInfo>> {
    let sessions = state.sessions.read().await;
    Json(sessions.participants())
}
