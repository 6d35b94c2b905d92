// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! This module implements QR code detection using the rqrr crate.
//! Images are converted to grayscale (and optionally downscaled) before the
//! grid search; results are mapped back to the caller's pixel coordinates.

use crate::backends::camera::types::CameraFrame;
use crate::constants::LIVE_DETECTION_MAX_DIMENSION;
use crate::frame_processor::types::{DetectedSymbol, MetadataObject};
use crate::geometry::Point;
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbaImage};
use rqrr::PreparedImage;
use tracing::{debug, trace, warn};

/// QR code detector
///
/// Live detection downscales large frames for speed; still-image decoding
/// runs at full resolution.
#[derive(Debug, Clone, Copy)]
pub struct QrDetector {
    /// Maximum dimension for processing, `None` for full resolution
    max_dimension: Option<u32>,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Detector tuned for live camera frames
    pub fn new() -> Self {
        Self {
            max_dimension: Some(LIVE_DETECTION_MAX_DIMENSION),
        }
    }

    /// Detector that never downscales
    pub fn high_accuracy() -> Self {
        Self {
            max_dimension: None,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: Some(max_dimension.max(1)),
        }
    }

    /// Detect symbols in a camera frame, normalized to the frame size
    pub fn detect_frame(&self, frame: &CameraFrame) -> Vec<MetadataObject> {
        let Some(image) = frame.to_rgba_image() else {
            warn!(
                width = frame.width,
                height = frame.height,
                stride = frame.stride,
                len = frame.data.len(),
                "Frame data does not match its dimensions"
            );
            return Vec::new();
        };

        self.detect_image(&image)
            .into_iter()
            .map(|symbol| MetadataObject::from_symbol(symbol, frame.width, frame.height))
            .collect()
    }

    /// Detect symbols in an RGBA image, in that image's pixel coordinates
    pub fn detect_image(&self, image: &RgbaImage) -> Vec<DetectedSymbol> {
        let start = std::time::Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let (gray, scale) = self.prepare_gray(image);
        let (proc_width, proc_height) = gray.dimensions();
        trace!(
            proc_width,
            proc_height,
            scale,
            conversion_ms = start.elapsed().as_millis(),
            "Prepared grayscale image"
        );

        let mut prepared =
            PreparedImage::prepare_from_greyscale(proc_width as usize, proc_height as usize, |x, y| {
                gray.get_pixel(x as u32, y as u32).0[0]
            });
        let grids = prepared.detect_grids();

        let mut symbols = Vec::with_capacity(grids.len());
        for grid in grids {
            let b = &grid.bounds;
            let corners = [&b[0], &b[1], &b[2], &b[3]]
                .map(|p| Point::new(p.x as f64 * scale, p.y as f64 * scale));

            let text = match grid.decode() {
                Ok((_meta, content)) => Some(content),
                Err(e) => {
                    debug!(error = ?e, "Found QR grid but failed to decode it");
                    None
                }
            };

            debug!(content = ?text, corners = ?corners, "Detected QR code");
            symbols.push(DetectedSymbol { corners, text });
        }

        if !symbols.is_empty() {
            debug!(
                count = symbols.len(),
                total_ms = start.elapsed().as_millis(),
                "QR detection found codes"
            );
        }

        symbols
    }

    /// Grayscale copy of `image`, downscaled if needed, and the factor that
    /// maps processed coordinates back to original ones
    fn prepare_gray(&self, image: &RgbaImage) -> (GrayImage, f64) {
        let (width, height) = image.dimensions();
        let gray = imageops::grayscale(image);

        match self.max_dimension {
            Some(max_dim) if width > max_dim || height > max_dim => {
                let scale = (width as f64 / max_dim as f64).max(height as f64 / max_dim as f64);
                let new_width = ((width as f64 / scale) as u32).max(1);
                let new_height = ((height as f64 / scale) as u32).max(1);
                let resized = imageops::resize(&gray, new_width, new_height, FilterType::Triangle);
                (resized, scale)
            }
            _ => (gray, 1.0),
        }
    }
}
