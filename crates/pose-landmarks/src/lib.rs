//! Body Landmark Interface
//!
//! This crate defines the 17-point single-subject keypoint layout and the
//! asynchronous provider interface the tracker consumes. The pose model
//! itself lives outside this workspace; a deterministic mock provider is
//! included for development and tests.

mod keypoint;
mod provider;

pub use keypoint::{Keypoint, KeypointId, Pose, KEYPOINT_COUNT};
pub use provider::{LandmarkProvider, MockLandmarkProvider};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a landmark provider
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LandmarkError {
    /// The user refused camera access
    #[error("Camera permission denied")]
    PermissionDenied,

    /// Model missing or backend failed to initialize
    #[error("Landmark model unavailable: {0}")]
    Unavailable(String),

    /// A single inference call failed
    #[error("Pose inference failed: {0}")]
    Inference(String),
}

/// Coarse error category surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    PermissionDenied,
    Generic,
}

impl LandmarkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LandmarkError::PermissionDenied => ErrorCategory::PermissionDenied,
            LandmarkError::Unavailable(_) | LandmarkError::Inference(_) => ErrorCategory::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            LandmarkError::PermissionDenied.category(),
            ErrorCategory::PermissionDenied
        );
        assert_eq!(
            LandmarkError::Inference("webgl context lost".into()).category(),
            ErrorCategory::Generic
        );
    }
}
