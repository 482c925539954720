//! Head position and scale tracking

use pose_landmarks::{KeypointId, Pose};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{HeadConfig, SizeFactors};
use crate::smoothing::{Point2, SmoothedField};

/// Landmark pair a size estimate was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSource {
    Shoulders,
    Eyes,
    Ears,
    Fallback,
}

/// Subject size from the first confident landmark pair (shoulders, eyes, ears)
pub fn estimate_size(pose: &Pose, factors: &SizeFactors, pair_confidence: f64) -> (f64, SizeSource) {
    let pairs = [
        (KeypointId::LeftShoulder, KeypointId::RightShoulder, factors.shoulder, SizeSource::Shoulders),
        (KeypointId::LeftEye, KeypointId::RightEye, factors.eye, SizeSource::Eyes),
        (KeypointId::LeftEar, KeypointId::RightEar, factors.ear, SizeSource::Ears),
    ];
    pairs
        .iter()
        .find_map(|&(a, b, factor, source)| {
            pose.confident_pair(a, b, pair_confidence)
                .map(|(l, r)| (l.distance(r) * factor, source))
        })
        .unwrap_or((factors.fallback, SizeSource::Fallback))
}

/// Smoothed head centre and size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadState {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

/// Square overlay of side `scale` centred on the head
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl HeadState {
    pub fn overlay_rect(&self) -> OverlayRect {
        OverlayRect {
            x: self.x - self.scale / 2.0,
            y: self.y - self.scale / 2.0,
            width: self.scale,
            height: self.scale,
        }
    }
}

/// Exponentially smoothed head tracker with freeze-on-loss
pub struct HeadTracker {
    config: HeadConfig,
    position: SmoothedField<Point2>,
    scale: SmoothedField<f64>,
}

impl HeadTracker {
    /// Tracker centred in a `width` x `height` frame
    pub fn new(config: HeadConfig, width: u32, height: u32) -> Self {
        let centre = Point2::new(f64::from(width) / 2.0, f64::from(height) / 2.0);
        Self {
            position: SmoothedField::new(centre, config.position_alpha, config.nose_confidence),
            scale: SmoothedField::ungated(config.scale_factors.fallback, config.scale_alpha),
            config,
        }
    }

    /// Feed one frame. Returns false (state untouched) when the nose is lost.
    pub fn update(&mut self, pose: &Pose, width: u32, height: u32) -> bool {
        let Some(nose) = pose.get(KeypointId::Nose) else {
            return false;
        };
        if !(nose.x.is_finite() && nose.y.is_finite()) {
            trace!("Non-finite nose position, head frozen");
            return false;
        }
        if !self.position.update(Point2::new(nose.x, nose.y), nose.confidence) {
            trace!("Nose confidence {:.2} below gate, head frozen", nose.confidence);
            return false;
        }
        let target = self.target_scale(pose, width, height);
        self.scale.advance(target);
        true
    }

    /// Unclamped size estimate and the pair it came from
    pub fn raw_target_scale(&self, pose: &Pose) -> (f64, SizeSource) {
        estimate_size(pose, &self.config.scale_factors, self.config.pair_confidence)
    }

    /// Size estimate clamped to `[min_scale, max_scale_ratio * min(w, h)]`
    pub fn target_scale(&self, pose: &Pose, width: u32, height: u32) -> f64 {
        let (raw, _) = self.raw_target_scale(pose);
        self.clamp_scale(raw, width, height)
    }

    fn clamp_scale(&self, scale: f64, width: u32, height: u32) -> f64 {
        let upper = f64::from(width.min(height)) * self.config.max_scale_ratio;
        let lower = self.config.min_scale;
        if scale.is_nan() {
            return lower;
        }
        // A frame too small for the lower clamp pins the scale to the floor
        scale.min(upper).max(lower)
    }

    pub fn state(&self) -> HeadState {
        let position = self.position.value();
        HeadState {
            x: position.x,
            y: position.y,
            scale: self.scale.value(),
        }
    }
}
