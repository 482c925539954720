//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use face_tracker::TrackerError;
use pose_landmarks::ErrorCategory;
use serde::Serialize;
use target_game::SessionError;
use thiserror::Error;

use crate::runtime::RuntimeError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Metrics setup failed: {0}")]
    Metrics(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, category) = match &self {
            ApiError::Runtime(RuntimeError::Session(_)) | ApiError::Session(_) => {
                (StatusCode::CONFLICT, None)
            }
            ApiError::Runtime(RuntimeError::Camera(e)) => {
                let category = if e.is_permission_denied() {
                    ErrorCategory::PermissionDenied
                } else {
                    ErrorCategory::Generic
                };
                (StatusCode::SERVICE_UNAVAILABLE, Some(category))
            }
            ApiError::Runtime(RuntimeError::Closed) => (StatusCode::SERVICE_UNAVAILABLE, None),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        let body = ErrorBody {
            error: self.to_string(),
            category,
        };
        (status, Json(body)).into_response()
    }
}
