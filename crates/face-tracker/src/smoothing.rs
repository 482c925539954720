//! Confidence-gated exponential smoothing

use serde::{Deserialize, Serialize};

/// Values that can be moved a fraction of the way toward a target
pub trait Lerp: Copy {
    fn lerp(self, target: Self, alpha: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(self, target: Self, alpha: f64) -> Self {
        self + (target - self) * alpha
    }
}

/// 2-D point in frame coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Lerp for Point2 {
    fn lerp(self, target: Self, alpha: f64) -> Self {
        Point2 {
            x: self.x.lerp(target.x, alpha),
            y: self.y.lerp(target.y, alpha),
        }
    }
}

/// First-order low-pass field that holds its value while input confidence
/// is below `min_confidence`.
#[derive(Debug, Clone)]
pub struct SmoothedField<T: Lerp> {
    value: T,
    alpha: f64,
    min_confidence: f64,
}

impl<T: Lerp> SmoothedField<T> {
    /// Field starting at `initial`; `alpha` is the per-update step toward raw input
    pub fn new(initial: T, alpha: f64, min_confidence: f64) -> Self {
        Self {
            value: initial,
            alpha: alpha.clamp(0.0, 1.0),
            min_confidence,
        }
    }

    /// Field that never freezes on confidence
    pub fn ungated(initial: T, alpha: f64) -> Self {
        Self::new(initial, alpha, f64::NEG_INFINITY)
    }

    /// Step toward `raw` unless `confidence` is below the freeze threshold.
    /// Returns whether the value moved.
    pub fn update(&mut self, raw: T, confidence: f64) -> bool {
        if confidence < self.min_confidence {
            return false;
        }
        self.advance(raw);
        true
    }

    /// Step toward `raw` unconditionally
    pub fn advance(&mut self, raw: T) -> T {
        self.value = self.value.lerp(raw, self.alpha);
        self.value
    }

    pub fn value(&self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_moves_fraction() {
        let mut field = SmoothedField::ungated(0.0, 0.2);
        assert!((field.advance(10.0) - 2.0).abs() < 1e-12);
        assert!((field.advance(10.0) - 3.6).abs() < 1e-12);
    }

    #[test]
    fn test_freeze_below_threshold() {
        let mut field = SmoothedField::new(Point2::new(5.0, 5.0), 0.5, 0.3);
        assert!(!field.update(Point2::new(100.0, 100.0), 0.29));
        assert_eq!(field.value(), Point2::new(5.0, 5.0));

        // Threshold itself is accepted
        assert!(field.update(Point2::new(15.0, 25.0), 0.3));
        assert_eq!(field.value(), Point2::new(10.0, 15.0));
    }

    #[test]
    fn test_converges() {
        let mut field = SmoothedField::ungated(0.0, 0.15);
        for _ in 0..200 {
            field.advance(42.0);
        }
        assert!((field.value() - 42.0).abs() < 1e-6);
    }
}
