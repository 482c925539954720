//! Lower-lip row estimation from raw pixels
//!
//! A face-sized crop below the nose is downscaled, lip-coloured pixels are
//! counted per row, and the densest row in a band below the nose is mapped
//! back to frame coordinates.

use camera_capture::{FrameSampler, Region};
use image::RgbaImage;
use pose_landmarks::{KeypointId, Pose};
use tracing::trace;

use crate::config::LipRowConfig;
use crate::head::estimate_size;

/// Half-up rounding (`-2.5` rounds to `-2`)
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Face crop in frame pixels, clipped to the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCrop {
    pub region: Region,
    /// Output pixels per source pixel
    pub scale: f64,
    pub out_width: u32,
    pub out_height: u32,
}

/// Pixel lip-row estimator
pub struct LipRowEstimator {
    config: LipRowConfig,
}

impl LipRowEstimator {
    pub fn new(config: LipRowConfig) -> Self {
        Self { config }
    }

    /// Lower-lip Y in frame coordinates, or `None` when no estimate is possible
    pub fn estimate(&self, pose: &Pose, sampler: &dyn FrameSampler) -> Option<f64> {
        let nose = pose.get(KeypointId::Nose)?;
        if nose.confidence < self.config.nose_confidence {
            return None;
        }
        let (frame_width, frame_height) = sampler.dimensions();
        let crop = self.face_crop(pose, frame_width, frame_height)?;

        let pixels = match sampler.sample(crop.region, crop.out_width, crop.out_height) {
            Ok(pixels) => pixels,
            Err(e) => {
                trace!("Lip crop sample failed: {}", e);
                return None;
            }
        };

        let rows = self.row_counts(&pixels);
        let total: u32 = rows.iter().sum();
        if total < self.config.min_mask_pixels {
            trace!("Lip mask too sparse ({} pixels)", total);
            return None;
        }
        let profile = smooth_profile(&rows, self.config.smoothing_radius);

        let nose_row = round_half_up((nose.y - f64::from(crop.region.y)) * crop.scale);
        let out_height = f64::from(crop.out_height);
        let min_row = (nose_row + out_height * self.config.band_min_ratio).floor().max(0.0);
        let max_row = (nose_row + out_height * self.config.band_max_ratio)
            .ceil()
            .min(out_height - 1.0);
        if min_row > max_row {
            return None;
        }

        let best_row = best_row(&profile, min_row as usize, max_row as usize)?;
        Some(f64::from(crop.region.y) + best_row as f64 / crop.scale)
    }

    /// Crop centred horizontally on the nose, extending above and below it.
    /// `None` when the clipped crop is too small to analyse.
    pub fn face_crop(&self, pose: &Pose, frame_width: u32, frame_height: u32) -> Option<FaceCrop> {
        let nose = pose.get(KeypointId::Nose)?;
        let (face_width, _) = estimate_size(pose, &self.config.face_factors, self.config.pair_confidence);
        let face_height = face_width * self.config.height_ratio;
        if !(face_width.is_finite() && nose.x.is_finite() && nose.y.is_finite()) {
            return None;
        }

        let mut x = round_half_up(nose.x - face_width * 0.5) as i64;
        let mut y = round_half_up(nose.y - face_height * self.config.top_offset_ratio) as i64;
        let mut width = round_half_up(face_width) as i64;
        let mut height = round_half_up(face_height) as i64;

        if x < 0 {
            width += x;
            x = 0;
        }
        if y < 0 {
            height += y;
            y = 0;
        }
        width = width.min(i64::from(frame_width) - x);
        height = height.min(i64::from(frame_height) - y);

        let min_crop = i64::from(self.config.min_crop);
        if width <= min_crop || height <= min_crop {
            return None;
        }

        let scale = f64::from(self.config.target_width) / width as f64;
        let min_output = f64::from(self.config.min_output);
        let out_width = round_half_up(width as f64 * scale).max(min_output) as u32;
        let out_height = round_half_up(height as f64 * scale).max(min_output) as u32;

        Some(FaceCrop {
            region: Region::new(x as u32, y as u32, width as u32, height as u32),
            scale,
            out_width,
            out_height,
        })
    }

    /// Lip-coloured pixel count per row
    fn row_counts(&self, pixels: &RgbaImage) -> Vec<u32> {
        pixels
            .rows()
            .map(|row| row.filter(|p| self.is_lip_pixel(p.0)).count() as u32)
            .collect()
    }

    fn is_lip_pixel(&self, [r, g, b, _]: [u8; 4]) -> bool {
        let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        if luma < self.config.luma_min || luma > self.config.luma_max {
            return false;
        }
        r - (g + b) / 2.0 > self.config.red_threshold
    }
}

/// Centred moving average clipped at the profile ends
fn smooth_profile(rows: &[u32], radius: usize) -> Vec<f64> {
    (0..rows.len())
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(rows.len() - 1);
            let window = &rows[lo..=hi];
            window.iter().map(|&c| f64::from(c)).sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// First row holding the band maximum; `None` if the maximum is not positive
fn best_row(profile: &[f64], min_row: usize, max_row: usize) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (row, &value) in profile.iter().enumerate().take(max_row + 1).skip(min_row) {
        if best.map_or(true, |(_, v)| value > v) {
            best = Some((row, value));
        }
    }
    best.filter(|&(_, v)| v > 0.0).map(|(row, _)| row)
}

/// Decides which frames run the pixel estimator and caches the last result
#[derive(Debug, Clone)]
pub struct LipRowSchedule {
    interval: u64,
    last_sample_frame: u64,
    cached: Option<f64>,
}

impl LipRowSchedule {
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            last_sample_frame: 0,
            cached: None,
        }
    }

    /// Whether processed frame `frame` is due for a pixel sample
    pub fn is_due(&self, frame: u64) -> bool {
        frame.saturating_sub(self.last_sample_frame) >= self.interval
    }

    /// Record a sample taken on `frame`. A failed sample keeps the old cache.
    pub fn record(&mut self, frame: u64, estimate: Option<f64>) {
        self.last_sample_frame = frame;
        if estimate.is_some() {
            self.cached = estimate;
        }
    }

    pub fn cached(&self) -> Option<f64> {
        self.cached
    }
}
