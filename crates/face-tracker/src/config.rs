//! Tracker configuration

use pose_landmarks::KeypointId;
use serde::{Deserialize, Serialize};

use crate::TrackerError;

/// Multipliers turning a landmark-pair distance into a size estimate.
///
/// Pairs are tried shoulder, then eye, then ear; `fallback` applies when no
/// pair is confident.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeFactors {
    pub shoulder: f64,
    pub eye: f64,
    pub ear: f64,
    pub fallback: f64,
}

/// Head tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadConfig {
    /// Below this nose confidence the head state is frozen
    pub nose_confidence: f64,
    /// Both landmarks of a pair must exceed this to be used for scale
    pub pair_confidence: f64,
    /// Fraction of the way the position moves toward the nose each frame
    pub position_alpha: f64,
    /// Fraction of the way the scale moves toward its target each frame
    pub scale_alpha: f64,
    pub scale_factors: SizeFactors,
    /// Lower scale clamp (pixels)
    pub min_scale: f64,
    /// Upper scale clamp as a multiple of min(frame width, frame height)
    pub max_scale_ratio: f64,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            nose_confidence: 0.3,
            pair_confidence: 0.3,
            position_alpha: 0.2,
            scale_alpha: 0.15,
            scale_factors: SizeFactors {
                shoulder: 2.0,
                eye: 6.5,
                ear: 2.2,
                fallback: 220.0,
            },
            min_scale: 140.0,
            max_scale_ratio: 1.1,
        }
    }
}

/// Eye classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeConfig {
    /// Both eyes must exceed this confidence to count as open
    pub open_confidence: f64,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self { open_confidence: 0.5 }
    }
}

/// Mouth classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MouthConfig {
    /// Landmark slots averaged for the fallback mouth indicator.
    ///
    /// The 17-point layout carries no mouth corners; slots 9/10 are read by
    /// default.
    pub corner_keypoints: [KeypointId; 2],
    /// Both corner slots must exceed this confidence
    pub corner_confidence: f64,
    /// Indicator frames averaged into the initial baseline
    pub baseline_frames: u32,
    /// Per-frame baseline adaptation once calibrated
    pub baseline_drift: f64,
    /// Per-frame smoothing of the normalized indicator
    pub smoothing_alpha: f64,
    /// Open threshold = baseline + open_margin
    pub open_margin: f64,
    /// Close threshold = baseline + close_margin
    pub close_margin: f64,
    /// Consecutive frames above the open threshold before committing open
    pub open_frames: u32,
    /// Consecutive frames below the close threshold before committing closed
    pub close_frames: u32,
    /// Drop the learned baseline whenever a round restarts
    pub reset_calibration_on_restart: bool,
}

impl Default for MouthConfig {
    fn default() -> Self {
        Self {
            corner_keypoints: [KeypointId::LeftWrist, KeypointId::RightWrist],
            corner_confidence: 0.3,
            baseline_frames: 30,
            baseline_drift: 0.002,
            smoothing_alpha: 0.12,
            open_margin: 0.06,
            close_margin: 0.04,
            open_frames: 3,
            close_frames: 3,
            reset_calibration_on_restart: false,
        }
    }
}

/// Lip-row estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LipRowConfig {
    /// Run the pixel estimator at all
    pub enabled: bool,
    /// Processed frames between pixel samples
    pub sample_interval: u64,
    /// Width the face crop is downscaled to
    pub target_width: u32,
    /// Minimum output edge after downscaling
    pub min_output: u32,
    /// Redness margin: R - (G + B) / 2 must exceed this
    pub red_threshold: f64,
    /// Minimum masked pixels over the whole crop
    pub min_mask_pixels: u32,
    /// Luminance gate (inclusive)
    pub luma_min: f64,
    pub luma_max: f64,
    /// Half width of the row-profile moving average
    pub smoothing_radius: usize,
    /// Search band below the nose row, as fractions of crop height
    pub band_min_ratio: f64,
    pub band_max_ratio: f64,
    pub face_factors: SizeFactors,
    /// Face height = width * height_ratio
    pub height_ratio: f64,
    /// Crop top sits this fraction of face height above the nose
    pub top_offset_ratio: f64,
    /// Clipped crops with an edge at or below this are rejected
    pub min_crop: u32,
    pub nose_confidence: f64,
    pub pair_confidence: f64,
}

impl Default for LipRowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_interval: 4,
            target_width: 140,
            min_output: 10,
            red_threshold: 18.0,
            min_mask_pixels: 20,
            luma_min: 18.0,
            luma_max: 245.0,
            smoothing_radius: 3,
            band_min_ratio: 0.08,
            band_max_ratio: 0.65,
            face_factors: SizeFactors {
                shoulder: 1.6,
                eye: 6.0,
                ear: 1.2,
                fallback: 220.0,
            },
            height_ratio: 1.15,
            top_offset_ratio: 0.35,
            min_crop: 8,
            nose_confidence: 0.3,
            pair_confidence: 0.3,
        }
    }
}

/// Face tracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub head: HeadConfig,
    pub eye: EyeConfig,
    pub mouth: MouthConfig,
    pub lip_row: LipRowConfig,
}

impl TrackerConfig {
    /// Landmark-only tracking (no pixel sampling)
    pub fn landmarks_only() -> Self {
        Self {
            lip_row: LipRowConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Reject values the estimators cannot work with
    pub fn validate(&self) -> Result<(), TrackerError> {
        let alphas = [
            ("head.position_alpha", self.head.position_alpha),
            ("head.scale_alpha", self.head.scale_alpha),
            ("mouth.smoothing_alpha", self.mouth.smoothing_alpha),
        ];
        for (name, alpha) in alphas {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {alpha}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.mouth.baseline_drift) {
            return Err(TrackerError::InvalidConfig(format!(
                "mouth.baseline_drift must be in [0, 1], got {}",
                self.mouth.baseline_drift
            )));
        }
        if self.mouth.baseline_frames == 0 {
            return Err(TrackerError::InvalidConfig(
                "mouth.baseline_frames must be at least 1".into(),
            ));
        }
        if self.head.min_scale <= 0.0 {
            return Err(TrackerError::InvalidConfig(
                "head.min_scale must be positive".into(),
            ));
        }
        if self.lip_row.target_width == 0 || self.lip_row.sample_interval == 0 {
            return Err(TrackerError::InvalidConfig(
                "lip_row.target_width and lip_row.sample_interval must be positive".into(),
            ));
        }
        if self.lip_row.band_min_ratio > self.lip_row.band_max_ratio {
            return Err(TrackerError::InvalidConfig(
                "lip_row band_min_ratio exceeds band_max_ratio".into(),
            ));
        }
        Ok(())
    }
}
