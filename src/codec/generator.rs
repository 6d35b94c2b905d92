// SPDX-License-Identifier: GPL-3.0-only

//! QR symbol rendering
//!
//! The symbol is first rendered as a minimal bitmap (one pixel per module plus
//! the quiet zone), then blown up with nearest-neighbor scaling so module
//! edges stay sharp. An optional overlay image is composited over the center.

use super::Scale;
use crate::constants::MAX_IMAGE_DIMENSION;
use crate::errors::CodecError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use tracing::debug;

const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Render `text` at error-correction level H, one pixel per module
pub fn symbol_bitmap(text: &str, quiet_zone: u32) -> Result<RgbaImage, CodecError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)?;
    let modules = code.width() as u32;
    let size = modules + 2 * quiet_zone;

    let mut bitmap = RgbaImage::from_pixel(size, size, LIGHT);
    for (i, color) in code.to_colors().iter().enumerate() {
        if *color == Color::Dark {
            let x = i as u32 % modules;
            let y = i as u32 / modules;
            bitmap.put_pixel(quiet_zone + x, quiet_zone + y, DARK);
        }
    }

    debug!(
        version = ?code.version(),
        modules,
        size,
        "Rendered minimal QR bitmap"
    );
    Ok(bitmap)
}

/// Scale a bitmap by independent horizontal/vertical factors without smoothing
pub fn upscale(bitmap: &RgbaImage, definition: Scale) -> Result<RgbaImage, CodecError> {
    definition.validate("definition")?;

    let width = scaled_length(bitmap.width(), definition.x, "definition")?;
    let height = scaled_length(bitmap.height(), definition.y, "definition")?;
    Ok(imageops::resize(bitmap, width, height, FilterType::Nearest))
}

/// Draw `overlay` centered over `background` at `scale` of its size
///
/// The result is opaque: the background is drawn in full first and the
/// overlay is alpha-blended on top of it.
pub fn composite_overlay(
    background: &RgbaImage,
    overlay: &DynamicImage,
    scale: Scale,
) -> Result<RgbaImage, CodecError> {
    scale.validate("overlay scale")?;

    let (bg_width, bg_height) = background.dimensions();
    let width = scaled_length(bg_width, scale.x, "overlay scale")?;
    let height = scaled_length(bg_height, scale.y, "overlay scale")?;
    let resized = imageops::resize(&overlay.to_rgba8(), width, height, FilterType::Triangle);

    let x = (bg_width as i64 - width as i64) / 2;
    let y = (bg_height as i64 - height as i64) / 2;

    let mut composite = RgbaImage::from_pixel(bg_width, bg_height, LIGHT);
    imageops::overlay(&mut composite, background, 0, 0);
    imageops::overlay(&mut composite, &resized, x, y);

    debug!(x, y, width, height, "Composited center overlay");
    Ok(composite)
}

/// `length * factor` in pixels, at least one and at most [`MAX_IMAGE_DIMENSION`]
fn scaled_length(length: u32, factor: f32, what: &str) -> Result<u32, CodecError> {
    let scaled = (length as f64 * factor as f64).round();
    if scaled > MAX_IMAGE_DIMENSION as f64 {
        return Err(CodecError::InvalidParameter(format!(
            "{} {} gives {} pixels, more than {}",
            what, factor, scaled, MAX_IMAGE_DIMENSION
        )));
    }
    Ok((scaled as u32).max(1))
}
