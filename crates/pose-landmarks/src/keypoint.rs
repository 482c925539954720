//! Keypoint and pose types

use serde::{Deserialize, Serialize};

/// Number of keypoints in a pose
pub const KEYPOINT_COUNT: usize = 17;

/// Anatomical keypoint slots, in provider order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointId {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointId {
    /// All slots in provider order
    pub const ALL: [KeypointId; KEYPOINT_COUNT] = [
        KeypointId::Nose,
        KeypointId::LeftEye,
        KeypointId::RightEye,
        KeypointId::LeftEar,
        KeypointId::RightEar,
        KeypointId::LeftShoulder,
        KeypointId::RightShoulder,
        KeypointId::LeftElbow,
        KeypointId::RightElbow,
        KeypointId::LeftWrist,
        KeypointId::RightWrist,
        KeypointId::LeftHip,
        KeypointId::RightHip,
        KeypointId::LeftKnee,
        KeypointId::RightKnee,
        KeypointId::LeftAnkle,
        KeypointId::RightAnkle,
    ];

    /// Position in the ordered keypoint sequence
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Provider-side part name
    pub fn name(self) -> &'static str {
        match self {
            KeypointId::Nose => "nose",
            KeypointId::LeftEye => "left_eye",
            KeypointId::RightEye => "right_eye",
            KeypointId::LeftEar => "left_ear",
            KeypointId::RightEar => "right_ear",
            KeypointId::LeftShoulder => "left_shoulder",
            KeypointId::RightShoulder => "right_shoulder",
            KeypointId::LeftElbow => "left_elbow",
            KeypointId::RightElbow => "right_elbow",
            KeypointId::LeftWrist => "left_wrist",
            KeypointId::RightWrist => "right_wrist",
            KeypointId::LeftHip => "left_hip",
            KeypointId::RightHip => "right_hip",
            KeypointId::LeftKnee => "left_knee",
            KeypointId::RightKnee => "right_knee",
            KeypointId::LeftAnkle => "left_ankle",
            KeypointId::RightAnkle => "right_ankle",
        }
    }
}

/// A tracked body landmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub id: KeypointId,
    pub x: f64,
    pub y: f64,
    /// Localization certainty in [0, 1]
    pub confidence: f64,
}

impl Keypoint {
    /// Create a keypoint; confidence is clamped to [0, 1]
    pub fn new(id: KeypointId, x: f64, y: f64, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self { id, x, y, confidence }
    }

    /// Euclidean distance to another keypoint
    pub fn distance(&self, other: &Keypoint) -> f64 {
        self.distance_to(other.x, other.y)
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One detected subject: keypoints in provider order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    /// Whole-pose score, if the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self {
            keypoints,
            score: None,
        }
    }

    /// Pose with every slot at (0, 0) and zero confidence
    pub fn empty() -> Self {
        Self::new(
            KeypointId::ALL
                .iter()
                .map(|&id| Keypoint::new(id, 0.0, 0.0, 0.0))
                .collect(),
        )
    }

    /// Builder-style override of a single slot
    pub fn with(mut self, id: KeypointId, x: f64, y: f64, confidence: f64) -> Self {
        let keypoint = Keypoint::new(id, x, y, confidence);
        match self.keypoints.get_mut(id.index()) {
            Some(slot) => *slot = keypoint,
            None => {
                while self.keypoints.len() < id.index() {
                    let missing = KeypointId::ALL[self.keypoints.len()];
                    self.keypoints.push(Keypoint::new(missing, 0.0, 0.0, 0.0));
                }
                self.keypoints.push(keypoint);
            }
        }
        self
    }

    pub fn get(&self, id: KeypointId) -> Option<&Keypoint> {
        self.keypoints.get(id.index())
    }

    /// Confidence of a slot; missing slots count as zero
    pub fn confidence(&self, id: KeypointId) -> f64 {
        self.get(id).map_or(0.0, |kp| kp.confidence)
    }

    /// Both keypoints of a pair, if each is strictly above `threshold`
    pub fn confident_pair(
        &self,
        a: KeypointId,
        b: KeypointId,
        threshold: f64,
    ) -> Option<(&Keypoint, &Keypoint)> {
        let first = self.get(a).filter(|kp| kp.confidence > threshold)?;
        let second = self.get(b).filter(|kp| kp.confidence > threshold)?;
        Some((first, second))
    }
}
