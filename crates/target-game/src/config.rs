//! Game configuration

use std::time::Duration;

use pose_landmarks::KeypointId;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Target sizing and collision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Radius = head scale * radius_factor, clamped to [min_radius, max_radius]
    pub radius_factor: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Keypoints that can hit the target, checked in order
    pub hit_keypoints: Vec<KeypointId>,
    /// A keypoint must exceed this confidence to count
    pub hit_confidence: f64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            radius_factor: 0.15,
            min_radius: 25.0,
            max_radius: 50.0,
            hit_keypoints: vec![
                KeypointId::LeftWrist,
                KeypointId::RightWrist,
                KeypointId::LeftAnkle,
                KeypointId::RightAnkle,
            ],
            hit_confidence: 0.5,
        }
    }
}

/// Round configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Hits needed to win
    pub max_score: u32,
    /// Round length in seconds
    pub time_limit_secs: f64,
    /// Timer tick period in milliseconds
    pub timer_interval_ms: u64,
    /// Remaining seconds at or below which the timer shows a warning
    pub warning_secs: f64,
    /// Remaining seconds at or below which the timer shows critical
    pub critical_secs: f64,
    pub target: TargetConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_score: 10,
            time_limit_secs: 15.0,
            timer_interval_ms: 100,
            warning_secs: 10.0,
            critical_secs: 5.0,
            target: TargetConfig::default(),
        }
    }
}

impl GameConfig {
    /// Short practice round
    pub fn practice() -> Self {
        Self {
            max_score: 5,
            time_limit_secs: 30.0,
            ..Default::default()
        }
    }

    /// Tight round with small targets
    pub fn challenge() -> Self {
        Self {
            max_score: 15,
            time_limit_secs: 15.0,
            target: TargetConfig {
                min_radius: 20.0,
                max_radius: 35.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.time_limit_secs)
    }

    pub fn timer_interval(&self) -> Duration {
        Duration::from_millis(self.timer_interval_ms)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.max_score == 0 {
            return Err(SessionError::InvalidConfig("max_score must be at least 1".into()));
        }
        if !(self.time_limit_secs.is_finite() && self.time_limit_secs > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "time_limit_secs must be positive, got {}",
                self.time_limit_secs
            )));
        }
        if self.timer_interval_ms == 0 {
            return Err(SessionError::InvalidConfig("timer_interval_ms must be positive".into()));
        }
        let target = &self.target;
        if !(target.min_radius > 0.0 && target.min_radius <= target.max_radius) {
            return Err(SessionError::InvalidConfig(format!(
                "target radius bounds [{}, {}] are invalid",
                target.min_radius, target.max_radius
            )));
        }
        if target.hit_keypoints.is_empty() {
            return Err(SessionError::InvalidConfig("target.hit_keypoints is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(GameConfig::default().validate().is_ok());
        assert!(GameConfig::practice().validate().is_ok());
        assert!(GameConfig::challenge().validate().is_ok());
    }

    #[test]
    fn test_default_round() {
        let config = GameConfig::default();
        assert_eq!(config.max_score, 10);
        assert_eq!(config.time_limit(), Duration::from_secs(15));
        assert_eq!(config.timer_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_rejects_inverted_radius() {
        let mut config = GameConfig::default();
        config.target.min_radius = 60.0;
        assert!(matches!(config.validate(), Err(SessionError::InvalidConfig(_))));
    }
}
