//! Video frame types and region sampling

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::CameraError;

/// Axis-aligned rectangle in source-frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the region lies entirely inside a `frame_width` x `frame_height` frame
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= frame_width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= frame_height)
    }
}

/// Pixel-sampling capability over a frame
pub trait FrameSampler {
    /// Frame dimensions (width, height)
    fn dimensions(&self) -> (u32, u32);

    /// Copy `region` out of the frame and rescale it to `out_width` x `out_height`
    fn sample(&self, region: Region, out_width: u32, out_height: u32)
        -> Result<RgbaImage, CameraError>;
}

/// Decoded RGBA video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGBA pixel data
    pub image: RgbaImage,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Wrap an RGBA image
    pub fn new(image: RgbaImage, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            image,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a new video frame from raw RGBA data (width * height * 4)
    pub fn from_raw(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(|image| Self::new(image, timestamp_ns, sequence))
    }

    /// Uniformly filled frame
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, Rgba(rgba)), 0, 0)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }
}

impl FrameSampler for VideoFrame {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn sample(
        &self,
        region: Region,
        out_width: u32,
        out_height: u32,
    ) -> Result<RgbaImage, CameraError> {
        let (frame_width, frame_height) = self.image.dimensions();
        if !region.fits_within(frame_width, frame_height) || out_width == 0 || out_height == 0 {
            return Err(CameraError::InvalidRegion {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                frame_width,
                frame_height,
            });
        }

        let cropped =
            imageops::crop_imm(&self.image, region.x, region.y, region.width, region.height)
                .to_image();
        if cropped.dimensions() == (out_width, out_height) {
            return Ok(cropped);
        }
        Ok(imageops::resize(&cropped, out_width, out_height, FilterType::Triangle))
    }
}
