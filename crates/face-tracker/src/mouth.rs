//! Mouth open/closed classification
//!
//! The indicator is a Y coordinate that drops when the mouth opens (the
//! lower-lip row from pixel analysis, or a landmark midpoint). It is
//! normalized by head scale relative to the nose, compared against a learned
//! neutral baseline, and debounced with a dead-band plus consecutive-frame
//! counters.

use pose_landmarks::Pose;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MouthConfig;

/// Where this frame's mouth indicator came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorSource {
    /// Lip-row estimate sampled on this frame
    LipRow,
    /// Lip-row estimate from an earlier sampling frame
    CachedLipRow,
    /// Midpoint of the configured corner landmarks
    Landmarks,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouthIndicator {
    pub y: f64,
    pub source: IndicatorSource,
}

/// Lip-row estimator outcome for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LipRowSample {
    /// The estimator did not run on this frame
    NotSampled,
    /// The estimator ran; `None` when it produced no estimate
    Sampled(Option<f64>),
}

/// Persistent baseline and debounce state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MouthCalibration {
    baseline_sum: f64,
    baseline_avg: f64,
    baseline_frames: u32,
    smoothed_normalized: f64,
    open_counter: u32,
    close_counter: u32,
}

impl MouthCalibration {
    pub fn baseline(&self) -> f64 {
        self.baseline_avg
    }

    pub fn baseline_frames(&self) -> u32 {
        self.baseline_frames
    }

    pub fn smoothed(&self) -> f64 {
        self.smoothed_normalized
    }

    pub fn open_counter(&self) -> u32 {
        self.open_counter
    }

    pub fn close_counter(&self) -> u32 {
        self.close_counter
    }
}

/// Calibrated, hysteresis-debounced mouth classifier
pub struct MouthClassifier {
    config: MouthConfig,
    calibration: MouthCalibration,
    mouth_open: bool,
}

impl MouthClassifier {
    pub fn new(config: MouthConfig) -> Self {
        Self {
            config,
            calibration: MouthCalibration::default(),
            mouth_open: false,
        }
    }

    /// Pick this frame's indicator: fresh lip row, then cached lip row on
    /// frames that were not sampled, then the corner-landmark midpoint.
    pub fn select_indicator(
        &self,
        lip_row: LipRowSample,
        cached_lip_row: Option<f64>,
        pose: &Pose,
    ) -> Option<MouthIndicator> {
        let pixel = match lip_row {
            LipRowSample::Sampled(Some(y)) => Some(MouthIndicator {
                y,
                source: IndicatorSource::LipRow,
            }),
            LipRowSample::Sampled(None) => None,
            LipRowSample::NotSampled => cached_lip_row.map(|y| MouthIndicator {
                y,
                source: IndicatorSource::CachedLipRow,
            }),
        };
        pixel.or_else(|| {
            let [left, right] = self.config.corner_keypoints;
            pose.confident_pair(left, right, self.config.corner_confidence)
                .map(|(l, r)| MouthIndicator {
                    y: (l.y + r.y) / 2.0,
                    source: IndicatorSource::Landmarks,
                })
                .filter(|indicator| indicator.y.is_finite())
        })
    }

    /// Feed one indicator sample. Returns the (possibly unchanged) mouth state.
    pub fn update(&mut self, indicator_y: f64, nose_y: f64, head_scale: f64) -> bool {
        let normalized = (indicator_y - nose_y) / head_scale;
        let frames = self.config.baseline_frames;

        let calibration = &mut self.calibration;
        if calibration.baseline_frames < frames {
            calibration.baseline_sum += normalized;
            calibration.baseline_frames += 1;
            calibration.baseline_avg = calibration.baseline_sum / f64::from(calibration.baseline_frames);
            if calibration.baseline_frames == frames {
                info!("Mouth baseline calibrated at {:.4}", calibration.baseline_avg);
            }
        }

        calibration.smoothed_normalized +=
            (normalized - calibration.smoothed_normalized) * self.config.smoothing_alpha;
        let smoothed = calibration.smoothed_normalized;

        let open = self.decide(smoothed);

        let calibration = &mut self.calibration;
        if calibration.baseline_frames >= frames {
            calibration.baseline_avg += (normalized - calibration.baseline_avg) * self.config.baseline_drift;
        }
        open
    }

    /// Hysteresis step on a smoothed value against the current baseline
    pub fn decide(&mut self, smoothed: f64) -> bool {
        let (open_threshold, close_threshold) = self.thresholds();
        let calibration = &mut self.calibration;

        if smoothed > open_threshold {
            calibration.open_counter += 1;
            calibration.close_counter = 0;
            if calibration.open_counter >= self.config.open_frames {
                self.set_open(true);
            }
        } else if smoothed < close_threshold {
            calibration.close_counter += 1;
            calibration.open_counter = 0;
            if calibration.close_counter >= self.config.close_frames {
                self.set_open(false);
            }
        } else {
            calibration.open_counter = 0;
            calibration.close_counter = 0;
        }
        self.mouth_open
    }

    fn set_open(&mut self, open: bool) {
        if self.mouth_open != open {
            debug!(
                "Mouth {} (smoothed {:.4}, baseline {:.4})",
                if open { "opened" } else { "closed" },
                self.calibration.smoothed_normalized,
                self.calibration.baseline_avg
            );
        }
        self.mouth_open = open;
    }

    /// (open threshold, close threshold)
    pub fn thresholds(&self) -> (f64, f64) {
        let baseline = self.calibration.baseline_avg;
        (baseline + self.config.open_margin, baseline + self.config.close_margin)
    }

    pub fn mouth_open(&self) -> bool {
        self.mouth_open
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.baseline_frames >= self.config.baseline_frames
    }

    pub fn calibration(&self) -> &MouthCalibration {
        &self.calibration
    }

    /// Forget the learned baseline and debounce counters; mouth state is kept
    pub fn reset_calibration(&mut self) {
        info!("Mouth calibration reset");
        self.calibration = MouthCalibration::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pose_landmarks::KeypointId;
    use proptest::prelude::*;

    const NOSE_Y: f64 = 200.0;
    const SCALE: f64 = 400.0;

    /// Classifier whose baseline settled at `baseline` after the calibration window
    fn calibrated(baseline: f64) -> MouthClassifier {
        let mut classifier = MouthClassifier::new(MouthConfig::default());
        for _ in 0..30 {
            classifier.update(NOSE_Y + baseline * SCALE, NOSE_Y, SCALE);
        }
        assert!(classifier.is_calibrated());
        classifier
    }

    #[test]
    fn test_baseline_is_mean_of_first_frames() {
        let mut classifier = MouthClassifier::new(MouthConfig::default());
        for i in 0..30 {
            let normalized = if i % 2 == 0 { 0.2 } else { 0.4 };
            classifier.update(NOSE_Y + normalized * SCALE, NOSE_Y, SCALE);
            if i == 28 {
                assert!(!classifier.is_calibrated());
            }
        }
        // Mean 0.3, then the 30th frame (0.4) drifts it by 0.2%
        let expected = 0.3 + (0.4 - 0.3) * 0.002;
        assert!((classifier.calibration().baseline() - expected).abs() < 1e-9);
        assert_eq!(classifier.calibration().baseline_frames(), 30);
    }

    #[test]
    fn test_baseline_drifts_slowly() {
        let mut classifier = calibrated(0.3);
        let before = classifier.calibration().baseline();
        classifier.update(NOSE_Y + 0.8 * SCALE, NOSE_Y, SCALE);
        let after = classifier.calibration().baseline();
        assert!((after - (before + (0.8 - before) * 0.002)).abs() < 1e-12);
    }

    #[test]
    fn test_three_frames_required_to_open() {
        let mut classifier = calibrated(0.3);
        let (open, _) = classifier.thresholds();
        assert!(!classifier.decide(open + 0.01));
        assert!(!classifier.decide(open + 0.01));
        assert!(classifier.decide(open + 0.01));
    }

    #[test]
    fn test_interrupted_run_does_not_flip() {
        let mut classifier = calibrated(0.3);
        let (open, close) = classifier.thresholds();
        assert!(!classifier.decide(open + 0.01));
        assert!(!classifier.decide(open + 0.01));
        // Dead-band frame resets the run
        assert!(!classifier.decide((open + close) / 2.0));
        assert!(!classifier.decide(open + 0.01));
        assert!(!classifier.decide(open + 0.01));
        assert_eq!(classifier.calibration().open_counter(), 2);
    }

    #[test]
    fn test_three_frames_required_to_close() {
        let mut classifier = calibrated(0.3);
        let (open, close) = classifier.thresholds();
        for _ in 0..3 {
            classifier.decide(open + 0.05);
        }
        assert!(classifier.mouth_open());

        assert!(classifier.decide(close - 0.01));
        assert!(classifier.decide(close - 0.01));
        assert!(!classifier.decide(close - 0.01));
    }

    #[test]
    fn test_update_opens_on_sustained_drop() {
        let mut classifier = calibrated(0.3);
        let mut opened_at = None;
        for frame in 0..60 {
            if classifier.update(NOSE_Y + 0.45 * SCALE, NOSE_Y, SCALE) {
                opened_at = Some(frame);
                break;
            }
        }
        assert!(opened_at.is_some());
        assert!(!classifier.calibration().smoothed().is_nan());
    }

    #[test]
    fn test_select_indicator_priority() {
        let classifier = MouthClassifier::new(MouthConfig::default());
        let corners = Pose::empty()
            .with(KeypointId::LeftWrist, 0.0, 300.0, 0.9)
            .with(KeypointId::RightWrist, 0.0, 320.0, 0.9);

        let fresh = classifier
            .select_indicator(LipRowSample::Sampled(Some(250.0)), Some(270.0), &corners)
            .unwrap();
        assert_eq!((fresh.y, fresh.source), (250.0, IndicatorSource::LipRow));

        let cached = classifier
            .select_indicator(LipRowSample::NotSampled, Some(270.0), &corners)
            .unwrap();
        assert_eq!((cached.y, cached.source), (270.0, IndicatorSource::CachedLipRow));

        // A failed sample skips the cache and falls through to landmarks
        let fallback = classifier
            .select_indicator(LipRowSample::Sampled(None), Some(270.0), &corners)
            .unwrap();
        assert_eq!((fallback.y, fallback.source), (310.0, IndicatorSource::Landmarks));

        let weak = Pose::empty()
            .with(KeypointId::LeftWrist, 0.0, 300.0, 0.9)
            .with(KeypointId::RightWrist, 0.0, 320.0, 0.3);
        assert!(classifier
            .select_indicator(LipRowSample::NotSampled, None, &weak)
            .is_none());

        let garbled = Pose::empty()
            .with(KeypointId::LeftWrist, 0.0, f64::NAN, 0.9)
            .with(KeypointId::RightWrist, 0.0, 320.0, 0.9);
        assert!(classifier
            .select_indicator(LipRowSample::NotSampled, None, &garbled)
            .is_none());
    }

    #[test]
    fn test_reset_calibration_keeps_state() {
        let mut classifier = calibrated(0.3);
        let (open, _) = classifier.thresholds();
        for _ in 0..3 {
            classifier.decide(open + 0.05);
        }
        classifier.reset_calibration();
        assert!(classifier.mouth_open());
        assert!(!classifier.is_calibrated());
        assert_eq!(classifier.calibration().baseline_frames(), 0);
    }

    proptest! {
        #[test]
        fn prop_dead_band_never_flips(
            start_open in any::<bool>(),
            samples in proptest::collection::vec(0.001f64..0.999, 1..100),
        ) {
            let mut classifier = calibrated(0.3);
            let (open, close) = classifier.thresholds();
            if start_open {
                for _ in 0..3 {
                    classifier.decide(open + 0.05);
                }
            }
            prop_assert_eq!(classifier.mouth_open(), start_open);
            for t in samples {
                let inside = close + (open - close) * t;
                prop_assert_eq!(classifier.decide(inside), start_open);
            }
        }
    }
}
