//! Synthetic camera used when no capture device is configured
//!
//! Renders a flat grey scene with a red lip band that periodically drops
//! lower, so the mouth classifier has something to lock on to.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{CameraConfig, CameraError, FrameSource, VideoFrame};

/// Layout of the synthetic scene
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticScene {
    /// Lip band centre (x, y) with the mouth closed
    pub lip_center: (u32, u32),
    /// Half width of the lip band
    pub lip_half_width: u32,
    /// Lip band thickness
    pub lip_thickness: u32,
    /// Downward shift of the band while the mouth is open
    pub open_offset: u32,
    /// Frames per open/close half cycle
    pub open_period_frames: u32,
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self {
            lip_center: (320, 260),
            lip_half_width: 30,
            lip_thickness: 8,
            open_offset: 45,
            open_period_frames: 90,
        }
    }
}

impl SyntheticScene {
    /// Whether the scene shows an open mouth at `sequence`
    pub fn mouth_open_at(&self, sequence: u32) -> bool {
        let period = self.open_period_frames.max(1);
        (sequence / period) % 2 == 1
    }
}

const BACKGROUND: Rgba<u8> = Rgba([120, 120, 120, 255]);
const LIP: Rgba<u8> = Rgba([170, 40, 50, 255]);

/// Camera that renders frames procedurally
pub struct SyntheticCamera {
    config: CameraConfig,
    scene: SyntheticScene,
    deny_permission: bool,
    open: bool,
    sequence: u32,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig, scene: SyntheticScene) -> Self {
        Self {
            config,
            scene,
            deny_permission: false,
            open: false,
            sequence: 0,
        }
    }

    /// Camera whose `open` always fails with `PermissionDenied`
    pub fn denied(config: CameraConfig) -> Self {
        Self {
            deny_permission: true,
            ..Self::new(config, SyntheticScene::default())
        }
    }

    fn render(&self, sequence: u32) -> RgbaImage {
        let (width, height) = (self.config.width, self.config.height);
        let (cx, cy) = self.scene.lip_center;
        let cy = if self.scene.mouth_open_at(sequence) {
            cy + self.scene.open_offset
        } else {
            cy
        };
        let half_thickness = self.scene.lip_thickness / 2;

        RgbaImage::from_fn(width, height, |x, y| {
            let in_band_x = x + self.scene.lip_half_width >= cx && x <= cx + self.scene.lip_half_width;
            let in_band_y = y + half_thickness >= cy && y <= cy + half_thickness;
            if in_band_x && in_band_y {
                LIP
            } else {
                BACKGROUND
            }
        })
    }
}

impl FrameSource for SyntheticCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.deny_permission {
            return Err(CameraError::PermissionDenied);
        }
        info!(
            "Synthetic camera opened ({}x{} @ {}fps)",
            self.config.width, self.config.height, self.config.fps
        );
        self.open = true;
        Ok(())
    }

    fn grab(&mut self) -> Result<VideoFrame, CameraError> {
        if !self.open {
            return Err(CameraError::NotInitialized);
        }
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        let fps = u64::from(self.config.fps.max(1));
        let timestamp_ns = u64::from(sequence) * 1_000_000_000 / fps;
        Ok(VideoFrame::new(self.render(sequence), timestamp_ns, sequence))
    }

    fn close(&mut self) {
        if self.open {
            debug!("Synthetic camera closed after {} frames", self.sequence);
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
