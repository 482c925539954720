//! Presentation snapshot published to clients

use camera_capture::CameraError;
use face_tracker::FaceAnalysis;
use pose_landmarks::{ErrorCategory, LandmarkError};
use serde::{Deserialize, Serialize};
use target_game::{Lifecycle, SessionSnapshot};

/// Categorized fatal error shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    pub message: String,
}

impl ErrorReport {
    pub fn user_message(category: ErrorCategory) -> &'static str {
        match category {
            ErrorCategory::PermissionDenied => {
                "Camera access was denied. Allow camera permission and start again."
            }
            ErrorCategory::Generic => "The pose detector stopped. Restart the camera to continue.",
        }
    }
}

impl From<&LandmarkError> for ErrorReport {
    fn from(e: &LandmarkError) -> Self {
        let category = e.category();
        Self {
            category,
            message: format!("{} ({})", Self::user_message(category), e),
        }
    }
}

impl From<&CameraError> for ErrorReport {
    fn from(e: &CameraError) -> Self {
        let category = if e.is_permission_denied() {
            ErrorCategory::PermissionDenied
        } else {
            ErrorCategory::Generic
        };
        Self {
            category,
            message: format!("{} ({})", Self::user_message(category), e),
        }
    }
}

/// Everything the presentation layer draws for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub face: FaceAnalysis,
    pub session: SessionSnapshot,
    /// Camera and detection loop are live
    pub tracking_active: bool,
    pub frames_processed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorReport>,
}

/// End-of-round banner text
pub fn round_message(session: &SessionSnapshot) -> Option<String> {
    match session.lifecycle {
        Lifecycle::Won => Some(format!(
            "Challenge complete! {} points in {:.1} s",
            session.max_score,
            session.won_after_secs.unwrap_or_default()
        )),
        Lifecycle::Lost => Some(format!(
            "Time's up! You scored {}/{}",
            session.score, session.max_score
        )),
        Lifecycle::Idle | Lifecycle::Running => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use target_game::{Target, TimerUrgency};

    fn session(lifecycle: Lifecycle, score: u32, won_after_secs: Option<f64>) -> SessionSnapshot {
        SessionSnapshot {
            lifecycle,
            score,
            max_score: 10,
            remaining_secs: 0.0,
            urgency: TimerUrgency::Critical,
            target: Target::default(),
            won_after_secs,
        }
    }

    #[test]
    fn test_round_messages() {
        assert_eq!(
            round_message(&session(Lifecycle::Won, 10, Some(8.34))).as_deref(),
            Some("Challenge complete! 10 points in 8.3 s")
        );
        assert_eq!(
            round_message(&session(Lifecycle::Lost, 4, None)).as_deref(),
            Some("Time's up! You scored 4/10")
        );
        assert!(round_message(&session(Lifecycle::Running, 4, None)).is_none());
    }

    #[test]
    fn test_error_report_categories() {
        let denied = ErrorReport::from(&CameraError::PermissionDenied);
        assert_eq!(denied.category, ErrorCategory::PermissionDenied);

        let failed = ErrorReport::from(&LandmarkError::Inference("backend lost".into()));
        assert_eq!(failed.category, ErrorCategory::Generic);
        assert!(failed.message.contains("backend lost"));
    }
}
