//! Landmark provider interface and mock implementation

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use camera_capture::VideoFrame;
use tracing::{debug, info};

use crate::{KeypointId, LandmarkError, Pose};

/// Asynchronous pose-landmark model
///
/// Returns zero or more poses per frame, each carrying the 17 keypoints in
/// provider order. The call is the only suspension point in a detection tick.
pub trait LandmarkProvider: Send + Sync + 'static {
    fn estimate_poses(
        &self,
        frame: &VideoFrame,
    ) -> impl Future<Output = Result<Vec<Pose>, LandmarkError>> + Send;

    /// Provider name for logging
    fn name(&self) -> &str;
}

enum MockMode {
    /// Procedural motion derived from the frame sequence number
    Synthetic,
    /// Canned responses, one per call; empty results once exhausted
    Scripted(Mutex<VecDeque<Result<Vec<Pose>, LandmarkError>>>),
}

/// Mock landmark provider for development and testing
pub struct MockLandmarkProvider {
    mode: MockMode,
    latency: Duration,
    calls: AtomicU64,
}

impl MockLandmarkProvider {
    /// Provider producing a swaying subject whose wrists sweep the frame
    pub fn synthetic() -> Self {
        info!("Creating synthetic landmark provider");
        Self {
            mode: MockMode::Synthetic,
            latency: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    /// Provider replaying `responses` in order
    pub fn scripted(responses: impl IntoIterator<Item = Result<Vec<Pose>, LandmarkError>>) -> Self {
        Self {
            mode: MockMode::Scripted(Mutex::new(responses.into_iter().collect())),
            latency: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    /// Simulated inference latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of estimate calls made so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_response(&self, frame: &VideoFrame) -> Result<Vec<Pose>, LandmarkError> {
        match &self.mode {
            MockMode::Synthetic => Ok(vec![synthetic_pose(frame)]),
            MockMode::Scripted(queue) => {
                let mut queue = queue
                    .lock()
                    .map_err(|_| LandmarkError::Unavailable("mock script poisoned".into()))?;
                queue.pop_front().unwrap_or_else(|| Ok(Vec::new()))
            }
        }
    }
}

impl LandmarkProvider for MockLandmarkProvider {
    fn estimate_poses(
        &self,
        frame: &VideoFrame,
    ) -> impl Future<Output = Result<Vec<Pose>, LandmarkError>> + Send {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let response = self.next_response(frame);
        let latency = self.latency;
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            debug!("Mock inference #{} -> {:?} poses", call, response.as_ref().map(Vec::len));
            response
        }
    }

    fn name(&self) -> &str {
        match self.mode {
            MockMode::Synthetic => "mock-synthetic",
            MockMode::Scripted(_) => "mock-scripted",
        }
    }
}

/// Deterministic subject facing the camera, laid out for a 640x480 frame and
/// scaled to the actual dimensions.
fn synthetic_pose(frame: &VideoFrame) -> Pose {
    let sx = f64::from(frame.width()) / 640.0;
    let sy = f64::from(frame.height()) / 480.0;
    let t = f64::from(frame.sequence) / 30.0;

    let nose_x = 320.0 + 40.0 * (0.7 * t).sin();
    let nose_y = 200.0;
    // Short blink every four seconds
    let eye_confidence = if t % 4.0 < 0.3 { 0.2 } else { 0.9 };

    let sweep_x = 320.0 + 260.0 * (0.9 * t).sin();
    let sweep_y = 240.0 + 180.0 * (1.3 * t).sin();

    let points = [
        (KeypointId::Nose, nose_x, nose_y, 0.95),
        (KeypointId::LeftEye, nose_x + 30.0, nose_y - 25.0, eye_confidence),
        (KeypointId::RightEye, nose_x - 30.0, nose_y - 25.0, eye_confidence),
        (KeypointId::LeftEar, nose_x + 60.0, nose_y - 10.0, 0.6),
        (KeypointId::RightEar, nose_x - 60.0, nose_y - 10.0, 0.6),
        (KeypointId::LeftShoulder, nose_x + 110.0, nose_y + 130.0, 0.9),
        (KeypointId::RightShoulder, nose_x - 110.0, nose_y + 130.0, 0.9),
        (KeypointId::LeftElbow, nose_x + 150.0, nose_y + 220.0, 0.7),
        (KeypointId::RightElbow, nose_x - 150.0, nose_y + 220.0, 0.7),
        (KeypointId::LeftWrist, sweep_x, sweep_y, 0.85),
        (KeypointId::RightWrist, 640.0 - sweep_x, 480.0 - sweep_y, 0.85),
        (KeypointId::LeftHip, nose_x + 80.0, 460.0, 0.4),
        (KeypointId::RightHip, nose_x - 80.0, 460.0, 0.4),
        (KeypointId::LeftKnee, nose_x + 80.0, 600.0, 0.1),
        (KeypointId::RightKnee, nose_x - 80.0, 600.0, 0.1),
        (KeypointId::LeftAnkle, nose_x + 80.0, 740.0, 0.05),
        (KeypointId::RightAnkle, nose_x - 80.0, 740.0, 0.05),
    ];

    points
        .iter()
        .fold(Pose::empty(), |pose, &(id, x, y, confidence)| {
            pose.with(id, x * sx, y * sy, confidence)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_pose_layout() {
        let provider = MockLandmarkProvider::synthetic();
        let frame = VideoFrame::filled(640, 480, [0, 0, 0, 255]);
        let poses = provider.estimate_poses(&frame).await.unwrap();
        assert_eq!(poses.len(), 1);

        let pose = &poses[0];
        assert_eq!(pose.keypoints.len(), crate::KEYPOINT_COUNT);
        assert!(pose.confidence(KeypointId::Nose) > 0.3);
        let (l, r) = pose
            .confident_pair(KeypointId::LeftShoulder, KeypointId::RightShoulder, 0.3)
            .unwrap();
        assert!((l.distance(r) - 220.0).abs() < 1e-9);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_scripted_replays_then_empties() {
        let provider = MockLandmarkProvider::scripted([
            Ok(vec![Pose::empty()]),
            Err(LandmarkError::Inference("boom".into())),
        ]);
        let frame = VideoFrame::filled(8, 8, [0, 0, 0, 255]);

        assert_eq!(provider.estimate_poses(&frame).await.unwrap().len(), 1);
        assert!(provider.estimate_poses(&frame).await.is_err());
        assert!(provider.estimate_poses(&frame).await.unwrap().is_empty());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_simulated() {
        let provider = MockLandmarkProvider::scripted([Ok(vec![])])
            .with_latency(Duration::from_millis(80));
        let frame = VideoFrame::filled(8, 8, [0, 0, 0, 255]);

        let start = tokio::time::Instant::now();
        provider.estimate_poses(&frame).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
