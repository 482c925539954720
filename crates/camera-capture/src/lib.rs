//! Camera Capture Library for Pose Tracking
//!
//! Provides the frame types consumed by the tracker:
//! - RGBA video frames from a webcam-style source
//! - Rectangular region sampling with downscaling
//! - A synthetic camera for development without hardware

pub mod frame;
pub mod synthetic;

pub use frame::{FrameSampler, Region, VideoFrame};
pub use synthetic::{SyntheticCamera, SyntheticScene};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Camera not initialized")]
    NotInitialized,

    #[error("Region {x},{y} {width}x{height} is outside the {frame_width}x{frame_height} frame")]
    InvalidRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },
}

impl CameraError {
    /// Whether the user refused camera access
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, CameraError::PermissionDenied)
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// A source of video frames (webcam, file, synthetic)
pub trait FrameSource: Send + 'static {
    /// Acquire the device. Fails with `PermissionDenied` when access is refused.
    fn open(&mut self) -> Result<(), CameraError>;

    /// Grab the most recent frame
    fn grab(&mut self) -> Result<VideoFrame, CameraError>;

    /// Release the device
    fn close(&mut self);

    /// Whether the device is currently open
    fn is_open(&self) -> bool;
}
