//! Session Routes
//!
//! The three user commands. Each returns the snapshot taken right after the
//! command was applied.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::ApiError;
use crate::snapshot::GameSnapshot;
use crate::AppState;

/// Start the camera pipeline and a round
pub async fn start(State(state): State<Arc<AppState>>) -> Result<Json<GameSnapshot>, ApiError> {
    Ok(Json(state.runtime.start().await?))
}

/// Stop everything and return to idle
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<Json<GameSnapshot>, ApiError> {
    Ok(Json(state.runtime.stop().await?))
}

/// Start a fresh round on the running pipeline
pub async fn restart(State(state): State<Arc<AppState>>) -> Result<Json<GameSnapshot>, ApiError> {
    Ok(Json(state.runtime.restart().await?))
}
