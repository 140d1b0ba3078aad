use crate::use_cases::SessionEngine;
use std::sync::Arc;

/// Shared application state for the HTTP and WebSocket handlers.
#[derive(Clone)]
pub struct AppState {
    // Entry point for join/move/leave intents.
    pub engine: Arc<SessionEngine>,
}
