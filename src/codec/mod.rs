// SPDX-License-Identifier: GPL-3.0-only

//! QR image codec
//!
//! Synchronous generation and decoding of QR symbol images. Neither operation
//! touches scan-session state, so both are safe to run off the UI thread;
//! [`QrCodec::decode_in_background`] does exactly that on a tokio blocking task.

pub mod generator;

use crate::constants::{self, DECODE_BOX_WIDTH, HIGHLIGHT_COLOR};
use crate::drawing;
use crate::errors::CodecError;
use crate::frame_processor::{DetectedSymbol, QrDetector};
use crate::geometry::Rect;
use image::DynamicImage;
use std::path::Path;
use tracing::{debug, info, warn};

/// Independent horizontal and vertical factors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn uniform(factor: f32) -> Self {
        Self {
            x: factor,
            y: factor,
        }
    }

    fn validate(&self, what: &str) -> Result<(), CodecError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if valid(self.x) && valid(self.y) {
            Ok(())
        } else {
            Err(CodecError::InvalidParameter(format!(
                "{} must be positive, got ({}, {})",
                what, self.x, self.y
            )))
        }
    }
}

/// Everything needed to render one QR image
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub text: String,
    /// Pixels per module along each axis
    pub definition: Scale,
    /// Image drawn over the center of the symbol
    pub overlay: Option<DynamicImage>,
    /// Overlay size as a fraction of the symbol's width and height
    pub overlay_scale: Scale,
}

impl GenerateRequest {
    /// Request with the default definition and no overlay
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            definition: Scale::uniform(constants::DEFAULT_DEFINITION),
            overlay: None,
            overlay_scale: Scale::uniform(constants::DEFAULT_OVERLAY_SCALE),
        }
    }

    pub fn with_definition(mut self, definition: Scale) -> Self {
        self.definition = definition;
        self
    }

    pub fn with_overlay(mut self, overlay: DynamicImage, scale: Scale) -> Self {
        self.overlay = Some(overlay);
        self.overlay_scale = scale;
        self
    }
}

/// A QR symbol found in a still image
///
/// `bounds` uses a bottom-left origin with y pointing up, the convention of
/// the feature API; canvases use a top-left origin, so the rectangle must be
/// flipped before drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Decoded text, empty if the symbol could not be read
    pub message: String,
    pub bounds: Rect,
}

impl Feature {
    fn from_symbol(symbol: DetectedSymbol, image_height: u32) -> Self {
        let bounds = symbol.bounds().flipped_vertically(image_height as f64);
        Self {
            message: symbol.text.unwrap_or_default(),
            bounds,
        }
    }

    /// Bounds in top-left-origin canvas coordinates
    pub fn canvas_bounds(&self, image_height: u32) -> Rect {
        self.bounds.flipped_vertically(image_height as f64)
    }
}

/// Decoded strings and the annotated image
#[derive(Debug, Clone)]
pub struct DecodeOutput {
    pub strings: Vec<String>,
    pub image: DynamicImage,
}

/// QR image generator and decoder
#[derive(Debug, Clone)]
pub struct QrCodec {
    detector: QrDetector,
    quiet_zone: u32,
}

impl Default for QrCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl QrCodec {
    pub fn new() -> Self {
        Self {
            detector: QrDetector::high_accuracy(),
            quiet_zone: constants::QUIET_ZONE_MODULES,
        }
    }

    /// Render a QR symbol for `text` at error-correction level H
    ///
    /// Without an overlay the image is `(modules + quiet zone) * definition`
    /// pixels. With one, the overlay is centered at `overlay_scale` of the
    /// symbol size. Decodability after compositing is not checked; level H
    /// leaves room for a small centered overlay.
    ///
    /// Fails with [`CodecError::InvalidParameter`] if either side would exceed
    /// [`constants::MAX_IMAGE_DIMENSION`] pixels.
    pub fn encode(
        &self,
        text: &str,
        definition: Scale,
        overlay: Option<&DynamicImage>,
        overlay_scale: Scale,
    ) -> Result<image::RgbaImage, CodecError> {
        let bitmap = generator::symbol_bitmap(text, self.quiet_zone)?;
        let symbol = generator::upscale(&bitmap, definition)?;

        info!(
            len = text.len(),
            width = symbol.width(),
            height = symbol.height(),
            overlay = overlay.is_some(),
            "Generated QR image"
        );

        match overlay {
            Some(overlay) => generator::composite_overlay(&symbol, overlay, overlay_scale),
            None => Ok(symbol),
        }
    }

    /// [`QrCodec::encode`] driven by a request value
    pub fn generate(&self, request: &GenerateRequest) -> Result<image::RgbaImage, CodecError> {
        self.encode(
            &request.text,
            request.definition,
            request.overlay.as_ref(),
            request.overlay_scale,
        )
    }

    /// Find QR symbols in a still image without decoding side effects
    pub fn features(&self, image: &DynamicImage) -> Vec<Feature> {
        let rgba = image.to_rgba8();
        self.detector
            .detect_image(&rgba)
            .into_iter()
            .map(|symbol| Feature::from_symbol(symbol, image.height()))
            .collect()
    }

    /// Decode every QR symbol in `image` and box each one in red
    ///
    /// With no symbols the input image is returned untouched.
    pub fn decode(&self, image: &DynamicImage) -> DecodeOutput {
        let features = self.features(image);
        if features.is_empty() {
            debug!("No QR features found");
            return DecodeOutput {
                strings: Vec::new(),
                image: image.clone(),
            };
        }

        let height = image.height();
        let mut canvas = image.to_rgba8();
        let mut strings = Vec::with_capacity(features.len());

        for feature in features {
            drawing::stroke_rect(
                &mut canvas,
                feature.canvas_bounds(height),
                DECODE_BOX_WIDTH,
                HIGHLIGHT_COLOR,
            );
            strings.push(feature.message);
        }

        info!(count = strings.len(), "Decoded QR image");
        DecodeOutput {
            strings,
            image: DynamicImage::ImageRgba8(canvas),
        }
    }

    /// [`QrCodec::decode`] on a blocking task
    pub async fn decode_in_background(&self, image: DynamicImage) -> DecodeOutput {
        let codec = self.clone();
        let fallback = image.clone();

        tokio::task::spawn_blocking(move || codec.decode(&image))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "QR decode task panicked");
                DecodeOutput {
                    strings: Vec::new(),
                    image: fallback,
                }
            })
    }

    /// Load an image file and decode it
    pub fn decode_file(&self, path: &Path) -> Result<DecodeOutput, CodecError> {
        let image = image::open(path)?;
        debug!(path = %path.display(), "Loaded image for decoding");
        Ok(self.decode(&image))
    }

    /// Generate an image and save it; the format follows the file extension
    pub fn encode_to_file(&self, request: &GenerateRequest, path: &Path) -> Result<(), CodecError> {
        let image = self.generate(request)?;
        image.save(path)?;
        info!(path = %path.display(), "Saved QR image");
        Ok(())
    }
}
