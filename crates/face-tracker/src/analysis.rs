//! Per-frame tracker output

use serde::{Deserialize, Serialize};

use crate::head::{HeadState, OverlayRect};
use crate::mouth::IndicatorSource;

/// Eye/mouth combination used to pick a head sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceExpression {
    OpenEyesOpenMouth,
    OpenEyesClosedMouth,
    ClosedEyesOpenMouth,
    ClosedEyesClosedMouth,
}

impl FaceExpression {
    pub fn from_state(eyes_open: bool, mouth_open: bool) -> Self {
        match (eyes_open, mouth_open) {
            (true, true) => Self::OpenEyesOpenMouth,
            (true, false) => Self::OpenEyesClosedMouth,
            (false, true) => Self::ClosedEyesOpenMouth,
            (false, false) => Self::ClosedEyesClosedMouth,
        }
    }

    /// Sprite asset name
    pub fn sprite(&self) -> &'static str {
        match self {
            Self::OpenEyesOpenMouth => "open_eye_open_mouth",
            Self::OpenEyesClosedMouth => "open_eye_close_mouth",
            Self::ClosedEyesOpenMouth => "close_eye_open_mouth",
            Self::ClosedEyesClosedMouth => "close_eye_close_mouth",
        }
    }
}

/// Tracker result for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAnalysis {
    pub head: HeadState,
    pub overlay: OverlayRect,
    pub eyes_open: bool,
    pub mouth_open: bool,
    pub expression: FaceExpression,
    /// False when the nose was lost and the state was held from the last frame
    pub nose_tracked: bool,
    /// Indicator that fed the mouth classifier, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouth_indicator: Option<IndicatorSource>,
    pub mouth_calibrated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_covers_all_combinations() {
        let all = [
            FaceExpression::from_state(true, true),
            FaceExpression::from_state(true, false),
            FaceExpression::from_state(false, true),
            FaceExpression::from_state(false, false),
        ];
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(FaceExpression::from_state(false, true).sprite(), "close_eye_open_mouth");
    }

    #[test]
    fn test_expression_serializes_snake_case() {
        let json = serde_json::to_string(&FaceExpression::OpenEyesClosedMouth).unwrap();
        assert_eq!(json, "\"open_eyes_closed_mouth\"");
    }
}
