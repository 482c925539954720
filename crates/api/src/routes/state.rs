//! State Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::snapshot::GameSnapshot;
use crate::AppState;

/// Latest published game snapshot
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<GameSnapshot> {
    Json(state.runtime.snapshot())
}
