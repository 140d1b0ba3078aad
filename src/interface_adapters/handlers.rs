use crate::interface_adapters::protocol::StatusResponse;
use crate::interface_adapters::state::AppState;
use axum::{Json, extract::State};
use std::sync::Arc;

// Report queue depth and live session count for operational checks.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let active_sessions = state.engine.registry().session_count().await;
    let queued_players = state.engine.queued_players().await;
    Json(StatusResponse {
        active_sessions,
        queued_players,
    })
}
