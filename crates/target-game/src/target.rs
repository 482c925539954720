//! Target placement and collision

use pose_landmarks::{KeypointId, Pose};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TargetConfig;

/// Circular target in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub visible: bool,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            radius: 30.0,
            visible: false,
        }
    }
}

/// Frame size the target is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Spawns the target and tests keypoints against it
pub struct TargetEngine<R: Rng = StdRng> {
    config: TargetConfig,
    bounds: Bounds,
    rng: R,
    target: Target,
}

impl TargetEngine<StdRng> {
    /// Engine seeded from the OS
    pub fn new(config: TargetConfig, bounds: Bounds) -> Self {
        Self::with_rng(config, bounds, StdRng::from_os_rng())
    }

    /// Deterministic engine
    pub fn seeded(config: TargetConfig, bounds: Bounds, seed: u64) -> Self {
        Self::with_rng(config, bounds, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TargetEngine<R> {
    pub fn with_rng(config: TargetConfig, bounds: Bounds, rng: R) -> Self {
        Self {
            config,
            bounds,
            rng,
            target: Target::default(),
        }
    }

    /// Radius for a given head scale
    pub fn radius_for(&self, head_scale: f64) -> f64 {
        let radius = head_scale * self.config.radius_factor;
        if radius.is_nan() {
            return self.config.min_radius;
        }
        radius.clamp(self.config.min_radius, self.config.max_radius)
    }

    /// Place a visible target sized from `head_scale`
    pub fn spawn(&mut self, head_scale: f64) -> Target {
        let radius = self.radius_for(head_scale);
        let x = self.coordinate(f64::from(self.bounds.width), radius);
        let y = self.coordinate(f64::from(self.bounds.height), radius);
        self.target = Target {
            x,
            y,
            radius,
            visible: true,
        };
        debug!("Target spawned at ({:.0}, {:.0}) r={:.1}", x, y, radius);
        self.target
    }

    /// `floor(U * (extent - 2r)) + r`, or the centre when the extent is too small
    fn coordinate(&mut self, extent: f64, radius: f64) -> f64 {
        let span = extent - 2.0 * radius;
        if span <= 0.0 {
            return extent / 2.0;
        }
        (self.rng.random::<f64>() * span).floor() + radius
    }

    pub fn hide(&mut self) {
        self.target.visible = false;
    }

    /// First configured keypoint strictly inside the visible target
    pub fn check_collision(&self, pose: &Pose) -> Option<KeypointId> {
        if !self.target.visible {
            return None;
        }
        self.config.hit_keypoints.iter().copied().find(|&id| {
            pose.get(id).is_some_and(|kp| {
                kp.confidence > self.config.hit_confidence
                    && kp.distance_to(self.target.x, self.target.y) < self.target.radius
            })
        })
    }

    pub fn target(&self) -> Target {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine() -> TargetEngine {
        TargetEngine::seeded(TargetConfig::default(), Bounds::new(640, 480), 7)
    }

    fn engine_with_target(x: f64, y: f64, radius: f64) -> TargetEngine {
        let mut engine = engine();
        engine.target = Target { x, y, radius, visible: true };
        engine
    }

    #[test]
    fn test_radius_clamped() {
        let engine = engine();
        assert_eq!(engine.radius_for(100.0), 25.0);
        assert!((engine.radius_for(220.0) - 33.0).abs() < 1e-9);
        assert_eq!(engine.radius_for(1000.0), 50.0);
        assert_eq!(engine.radius_for(f64::NAN), 25.0);
    }

    #[test]
    fn test_spawn_in_tiny_frame_uses_centre() {
        let mut engine = TargetEngine::seeded(TargetConfig::default(), Bounds::new(40, 480), 1);
        let target = engine.spawn(220.0);
        assert_eq!(target.x, 20.0);
        assert!(target.visible);
    }

    #[test]
    fn test_collision_strictly_inside() {
        let engine = engine_with_target(100.0, 100.0, 30.0);
        let inside = Pose::empty().with(KeypointId::LeftWrist, 110.0, 100.0, 0.9);
        assert_eq!(engine.check_collision(&inside), Some(KeypointId::LeftWrist));

        // Distance exactly equal to the radius is a miss
        let edge = Pose::empty().with(KeypointId::RightAnkle, 130.0, 100.0, 0.9);
        assert_eq!(engine.check_collision(&edge), None);
    }

    #[test]
    fn test_collision_requires_confidence() {
        let engine = engine_with_target(100.0, 100.0, 30.0);
        let weak = Pose::empty().with(KeypointId::RightWrist, 100.0, 100.0, 0.5);
        assert_eq!(engine.check_collision(&weak), None);
    }

    #[test]
    fn test_collision_ignores_other_keypoints() {
        let engine = engine_with_target(100.0, 100.0, 30.0);
        let nose = Pose::empty().with(KeypointId::Nose, 100.0, 100.0, 0.9);
        assert_eq!(engine.check_collision(&nose), None);
    }

    #[test]
    fn test_first_hit_wins() {
        let engine = engine_with_target(100.0, 100.0, 30.0);
        let both = Pose::empty()
            .with(KeypointId::RightWrist, 100.0, 100.0, 0.9)
            .with(KeypointId::LeftAnkle, 100.0, 100.0, 0.9);
        assert_eq!(engine.check_collision(&both), Some(KeypointId::RightWrist));
    }

    #[test]
    fn test_hidden_target_never_collides() {
        let mut engine = engine_with_target(100.0, 100.0, 30.0);
        engine.hide();
        let pose = Pose::empty().with(KeypointId::LeftWrist, 100.0, 100.0, 0.9);
        assert_eq!(engine.check_collision(&pose), None);
    }

    proptest! {
        #[test]
        fn prop_spawn_inside_frame(
            seed in any::<u64>(),
            scale in 0.0f64..2000.0,
            width in 100u32..1920,
            height in 100u32..1080,
        ) {
            let mut engine = TargetEngine::seeded(TargetConfig::default(), Bounds::new(width, height), seed);
            let target = engine.spawn(scale);
            let (w, h) = (f64::from(width), f64::from(height));
            prop_assert!(target.radius >= 25.0 && target.radius <= 50.0);
            prop_assert!(target.x >= target.radius && target.x <= w - target.radius);
            prop_assert!(target.y >= target.radius && target.y <= h - target.radius);
        }
    }
}
