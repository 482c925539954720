//! Eye open/closed classification

use pose_landmarks::{KeypointId, Pose};

use crate::config::EyeConfig;

/// Instantaneous eye-state classifier.
///
/// Eyes count as open when the provider localizes both of them confidently;
/// a closed eye typically drops the eye keypoint confidence.
pub struct EyeClassifier {
    config: EyeConfig,
}

impl EyeClassifier {
    pub fn new(config: EyeConfig) -> Self {
        Self { config }
    }

    pub fn is_open(&self, pose: &Pose) -> bool {
        let threshold = self.config.open_confidence;
        pose.confidence(KeypointId::LeftEye) > threshold
            && pose.confidence(KeypointId::RightEye) > threshold
    }
}
