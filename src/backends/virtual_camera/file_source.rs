// SPDX-License-Identifier: GPL-3.0-only

//! Still-image frame sources for the virtual camera
//!
//! Images are treated as the scene in front of the camera: they are fitted
//! onto a white canvas in view orientation and then rotated into the sensor's
//! orientation, so a sideways-mounted virtual sensor sees them the way a real
//! one would.

use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame, SensorRotation};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;
use tracing::debug;

/// Load image files as scenes for a sensor of the given size and rotation
pub fn load_scene_frames(
    paths: &[impl AsRef<Path>],
    sensor_size: (u32, u32),
    rotation: SensorRotation,
) -> BackendResult<Vec<CameraFrame>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let img = image::open(path).map_err(|e| {
                BackendError::IoError(format!("Failed to load image '{}': {}", path.display(), e))
            })?;
            Ok(scene_to_frame(&img, sensor_size, rotation))
        })
        .collect()
}

/// Place a scene image in front of a virtual sensor
///
/// `sensor_size` is the sensor's own (unrotated) width and height.
pub fn scene_to_frame(
    scene: &DynamicImage,
    sensor_size: (u32, u32),
    rotation: SensorRotation,
) -> CameraFrame {
    let (sensor_w, sensor_h) = sensor_size;
    let (view_w, view_h) = if rotation.swaps_dimensions() {
        (sensor_h, sensor_w)
    } else {
        (sensor_w, sensor_h)
    };

    let mut canvas = RgbaImage::from_pixel(view_w, view_h, Rgba([255, 255, 255, 255]));
    let fitted = fit_within(scene, view_w, view_h);
    let x = (view_w as i64 - fitted.width() as i64) / 2;
    let y = (view_h as i64 - fitted.height() as i64) / 2;
    imageops::overlay(&mut canvas, &fitted, x, y);

    // The view shows the sensor rotated by `rotation`, so undo it here
    let sensor_image = match rotation {
        SensorRotation::None => canvas,
        SensorRotation::Rotate90 => imageops::rotate270(&canvas),
        SensorRotation::Rotate180 => imageops::rotate180(&canvas),
        SensorRotation::Rotate270 => imageops::rotate90(&canvas),
    };

    debug!(
        scene_width = scene.width(),
        scene_height = scene.height(),
        sensor_w,
        sensor_h,
        %rotation,
        "Prepared scene frame"
    );

    CameraFrame::from_rgba(sensor_image, 0)
}

/// A uniformly gray frame, what the sensor sees when nothing is in front of it
pub fn blank_frame(sensor_size: (u32, u32)) -> CameraFrame {
    let (w, h) = sensor_size;
    CameraFrame::from_rgba(RgbaImage::from_pixel(w, h, Rgba([128, 128, 128, 255])), 0)
}

/// Downscale an image to fit `max_w x max_h`, keeping the aspect ratio
fn fit_within(img: &DynamicImage, max_w: u32, max_h: u32) -> RgbaImage {
    if img.width() <= max_w && img.height() <= max_h {
        return img.to_rgba8();
    }

    let scale = (max_w as f32 / img.width() as f32).min(max_h as f32 / img.height() as f32);
    let w = ((img.width() as f32 * scale) as u32).max(1);
    let h = ((img.height() as f32 * scale) as u32).max(1);
    imageops::resize(&img.to_rgba8(), w, h, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked_scene() -> DynamicImage {
        // 4x2 white image with a black pixel in the top-left corner
        let mut img = RgbaImage::from_pixel(4, 2, Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_scene_is_centered_on_unrotated_sensor() {
        let frame = scene_to_frame(&marked_scene(), (8, 6), SensorRotation::None);
        assert_eq!((frame.width, frame.height), (8, 6));

        let image = frame.to_rgba_image().unwrap();
        // Scene origin lands at ((8-4)/2, (6-2)/2)
        assert_eq!(image.get_pixel(2, 2).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_rotated_sensor_sees_rotated_scene() {
        let frame = scene_to_frame(&marked_scene(), (8, 6), SensorRotation::Rotate90);
        assert_eq!((frame.width, frame.height), (8, 6));

        // Rotating the sensor image back must give the view canvas
        let view = imageops::rotate90(&frame.to_rgba_image().unwrap());
        assert_eq!(view.dimensions(), (6, 8));
        assert_eq!(view.get_pixel(1, 3).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_large_scene_is_downscaled() {
        let scene = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            100,
            50,
            Rgba([0, 0, 0, 255]),
        ));
        let frame = scene_to_frame(&scene, (20, 20), SensorRotation::None);
        let image = frame.to_rgba_image().unwrap();
        // Fitted to 20x10 and centered vertically
        assert_eq!(image.get_pixel(10, 10).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(10, 2).0, [255, 255, 255, 255]);
    }
}
