//! Face Tracker
//!
//! Per-frame head and expression estimation from body landmarks:
//! - Smoothed head position and size with freeze-on-loss
//! - Eye open/closed from eye keypoint confidence
//! - Mouth open/closed from a calibrated, debounced lip indicator
//! - Pixel lower-lip row estimation on a sampling schedule

pub mod analysis;
pub mod config;
pub mod eye;
pub mod head;
pub mod lip_row;
pub mod mouth;
pub mod smoothing;

pub use analysis::{FaceAnalysis, FaceExpression};
pub use config::{EyeConfig, HeadConfig, LipRowConfig, MouthConfig, SizeFactors, TrackerConfig};
pub use eye::EyeClassifier;
pub use head::{HeadState, HeadTracker, OverlayRect, SizeSource};
pub use lip_row::{LipRowEstimator, LipRowSchedule};
pub use mouth::{IndicatorSource, LipRowSample, MouthCalibration, MouthClassifier};
pub use smoothing::{Lerp, Point2, SmoothedField};

use camera_capture::FrameSampler;
use pose_landmarks::{KeypointId, Pose};
use thiserror::Error;
use tracing::{debug, info};

/// Face tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

/// Face tracking module
pub struct FaceTracker {
    config: TrackerConfig,
    frame_width: u32,
    frame_height: u32,
    head: HeadTracker,
    eyes: EyeClassifier,
    mouth: MouthClassifier,
    lip_row: LipRowEstimator,
    schedule: LipRowSchedule,
    eyes_open: bool,
    nose_tracked: bool,
    last_indicator: Option<IndicatorSource>,
    frames: u64,
}

impl FaceTracker {
    /// Create a tracker for `frame_width` x `frame_height` frames
    pub fn new(config: TrackerConfig, frame_width: u32, frame_height: u32) -> Result<Self, TrackerError> {
        config.validate()?;
        if frame_width == 0 || frame_height == 0 {
            return Err(TrackerError::InvalidConfig(format!(
                "frame size {frame_width}x{frame_height} is empty"
            )));
        }
        info!(
            "Face tracker ready for {}x{} frames (lip row {})",
            frame_width,
            frame_height,
            if config.lip_row.enabled { "enabled" } else { "disabled" }
        );
        Ok(Self {
            head: HeadTracker::new(config.head.clone(), frame_width, frame_height),
            eyes: EyeClassifier::new(config.eye.clone()),
            mouth: MouthClassifier::new(config.mouth.clone()),
            lip_row: LipRowEstimator::new(config.lip_row.clone()),
            schedule: LipRowSchedule::new(config.lip_row.sample_interval),
            eyes_open: true,
            nose_tracked: false,
            last_indicator: None,
            frames: 0,
            frame_width,
            frame_height,
            config,
        })
    }

    /// Process one pose. `sampler` gives pixel access to the frame the pose
    /// was estimated from; without it only landmarks are used.
    pub fn process(&mut self, pose: &Pose, sampler: Option<&dyn FrameSampler>) -> FaceAnalysis {
        self.frames += 1;

        let lip_row = match sampler {
            Some(sampler) if self.config.lip_row.enabled && self.schedule.is_due(self.frames) => {
                let estimate = self.lip_row.estimate(pose, sampler);
                self.schedule.record(self.frames, estimate);
                LipRowSample::Sampled(estimate)
            }
            _ => LipRowSample::NotSampled,
        };

        if !self.head.update(pose, self.frame_width, self.frame_height) {
            self.nose_tracked = false;
            self.last_indicator = None;
            return self.current();
        }
        self.eyes_open = self.eyes.is_open(pose);

        let indicator = self
            .mouth
            .select_indicator(lip_row, self.schedule.cached(), pose);
        if let (Some(indicator), Some(nose)) = (indicator, pose.get(KeypointId::Nose)) {
            self.mouth.update(indicator.y, nose.y, self.head.state().scale);
        }
        debug!(
            "Frame {}: eyes {} mouth {} via {:?}",
            self.frames,
            self.eyes_open,
            self.mouth.mouth_open(),
            indicator.map(|i| i.source)
        );
        self.nose_tracked = true;
        self.last_indicator = indicator.map(|i| i.source);
        self.current()
    }

    /// Result of the most recent frame
    pub fn current(&self) -> FaceAnalysis {
        let head = self.head.state();
        let mouth_open = self.mouth.mouth_open();
        FaceAnalysis {
            head,
            overlay: head.overlay_rect(),
            eyes_open: self.eyes_open,
            mouth_open,
            expression: FaceExpression::from_state(self.eyes_open, mouth_open),
            nose_tracked: self.nose_tracked,
            mouth_indicator: self.last_indicator,
            mouth_calibrated: self.mouth.is_calibrated(),
        }
    }

    /// Called when a game round restarts
    pub fn on_round_restart(&mut self) {
        if self.config.mouth.reset_calibration_on_restart {
            self.mouth.reset_calibration();
        }
    }

    pub fn mouth_calibration(&self) -> &MouthCalibration {
        self.mouth.calibration()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::{CameraConfig, FrameSource, SyntheticCamera, SyntheticScene, VideoFrame};

    fn tracked_pose(nose_conf: f64, mouth_y: f64) -> Pose {
        Pose::empty()
            .with(KeypointId::Nose, 320.0, 200.0, nose_conf)
            .with(KeypointId::LeftEye, 335.0, 185.0, 0.9)
            .with(KeypointId::RightEye, 305.0, 185.0, 0.9)
            .with(KeypointId::LeftShoulder, 430.0, 330.0, 0.9)
            .with(KeypointId::RightShoulder, 210.0, 330.0, 0.9)
            .with(KeypointId::LeftWrist, 310.0, mouth_y, 0.9)
            .with(KeypointId::RightWrist, 330.0, mouth_y, 0.9)
    }

    #[test]
    fn test_rejects_empty_frame() {
        assert!(FaceTracker::new(TrackerConfig::default(), 0, 480).is_err());
    }

    #[test]
    fn test_initial_state() {
        let tracker = FaceTracker::new(TrackerConfig::default(), 640, 480).unwrap();
        let analysis = tracker.current();
        assert!(analysis.eyes_open);
        assert!(!analysis.mouth_open);
        assert_eq!(analysis.expression, FaceExpression::OpenEyesClosedMouth);
        assert_eq!((analysis.head.x, analysis.head.y), (320.0, 240.0));
    }

    #[test]
    fn test_nose_loss_freezes_everything() {
        let mut tracker = FaceTracker::new(TrackerConfig::landmarks_only(), 640, 480).unwrap();
        tracker.process(&tracked_pose(0.9, 260.0), None);
        let before = tracker.current();

        // Eyes would read closed, but the nose gate holds the previous state
        let lost = tracked_pose(0.1, 400.0)
            .with(KeypointId::LeftEye, 0.0, 0.0, 0.0);
        let analysis = tracker.process(&lost, None);
        assert!(!analysis.nose_tracked);
        assert_eq!(analysis.head, before.head);
        assert!(analysis.eyes_open);
        assert_eq!(tracker.mouth_calibration().baseline_frames(), 1);
    }

    #[test]
    fn test_non_finite_nose_does_not_poison_state() {
        let mut tracker = FaceTracker::new(TrackerConfig::landmarks_only(), 640, 480).unwrap();
        tracker.process(&tracked_pose(0.9, 300.0), None);
        let before = tracker.current();

        let garbled = tracked_pose(0.9, 300.0).with(KeypointId::Nose, f64::NAN, f64::NAN, 0.9);
        let analysis = tracker.process(&garbled, None);
        assert!(!analysis.nose_tracked);
        assert_eq!(analysis.head, before.head);
        assert_eq!(tracker.mouth_calibration().baseline_frames(), 1);

        let analysis = tracker.process(&tracked_pose(0.9, 300.0), None);
        assert!(analysis.nose_tracked);
        assert!(analysis.head.x.is_finite() && analysis.head.y.is_finite());
        assert!(!tracker.mouth_calibration().smoothed().is_nan());
    }

    #[test]
    fn test_landmark_mouth_opens_after_calibration() {
        let mut tracker = FaceTracker::new(TrackerConfig::landmarks_only(), 640, 480).unwrap();
        for _ in 0..60 {
            let analysis = tracker.process(&tracked_pose(0.9, 300.0), None);
            assert_eq!(analysis.mouth_indicator, Some(IndicatorSource::Landmarks));
        }
        assert!(!tracker.current().mouth_open);

        let mut opened = false;
        for _ in 0..40 {
            if tracker.process(&tracked_pose(0.9, 360.0), None).mouth_open {
                opened = true;
                break;
            }
        }
        assert!(opened);
        assert_eq!(tracker.current().expression, FaceExpression::OpenEyesOpenMouth);
    }

    #[test]
    fn test_lip_row_sampled_every_fourth_frame() {
        let config = CameraConfig::default();
        let mut camera = SyntheticCamera::new(config, SyntheticScene::default());
        camera.open().unwrap();
        let frame: VideoFrame = camera.grab().unwrap();
        let sampler: &dyn FrameSampler = &frame;
        let mut tracker = FaceTracker::new(TrackerConfig::default(), 640, 480).unwrap();
        let pose = tracked_pose(0.9, 300.0);

        let sources: Vec<_> = (0..8)
            .map(|_| tracker.process(&pose, Some(sampler)).mouth_indicator)
            .collect();
        assert_eq!(sources[0], Some(IndicatorSource::Landmarks));
        assert_eq!(sources[3], Some(IndicatorSource::LipRow));
        assert_eq!(sources[4], Some(IndicatorSource::CachedLipRow));
        assert_eq!(sources[7], Some(IndicatorSource::LipRow));
    }

    #[test]
    fn test_lip_row_drives_mouth_open_and_closed() {
        let mut camera = SyntheticCamera::new(CameraConfig::default(), SyntheticScene::default());
        camera.open().unwrap();
        let mut tracker = FaceTracker::new(TrackerConfig::default(), 640, 480).unwrap();
        // Wrist midpoint sits between nose and lips, as in the synthetic provider
        let pose = tracked_pose(0.9, 240.0);

        let mut flips = Vec::new();
        let mut open = false;
        for _ in 0..240 {
            let frame = camera.grab().unwrap();
            let sampler: &dyn FrameSampler = &frame;
            let analysis = tracker.process(&pose, Some(sampler));
            if analysis.mouth_open != open {
                open = analysis.mouth_open;
                flips.push((frame.sequence, open));
            }
        }

        assert_eq!(flips.len(), 2, "flips: {flips:?}");
        let scene = SyntheticScene::default();
        assert!(flips[0].1 && scene.mouth_open_at(flips[0].0));
        assert!(!flips[1].1 && !scene.mouth_open_at(flips[1].0));
    }

    #[test]
    fn test_restart_keeps_calibration_by_default() {
        let mut tracker = FaceTracker::new(TrackerConfig::landmarks_only(), 640, 480).unwrap();
        for _ in 0..5 {
            tracker.process(&tracked_pose(0.9, 300.0), None);
        }
        tracker.on_round_restart();
        assert_eq!(tracker.mouth_calibration().baseline_frames(), 5);

        let mut config = TrackerConfig::landmarks_only();
        config.mouth.reset_calibration_on_restart = true;
        let mut tracker = FaceTracker::new(config, 640, 480).unwrap();
        tracker.process(&tracked_pose(0.9, 300.0), None);
        tracker.on_round_restart();
        assert_eq!(tracker.mouth_calibration().baseline_frames(), 0);
    }
}
