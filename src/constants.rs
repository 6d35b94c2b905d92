// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use image::Rgba;
use std::time::Duration;

/// Outline and box color for detected symbols
pub const HIGHLIGHT_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Stroke width of the outline drawn on the live preview for each symbol
pub const PREVIEW_OUTLINE_WIDTH: f32 = 6.0;

/// Stroke width of the box drawn around symbols found in a still image
pub const DECODE_BOX_WIDTH: u32 = 10;

/// Default definition (pixels per module) for generated symbols
pub const DEFAULT_DEFINITION: f32 = 30.0;

/// Default overlay size as a fraction of the symbol's width and height
pub const DEFAULT_OVERLAY_SCALE: f32 = 0.3;

/// Largest width or height of a generated image, in pixels
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

/// Light modules around the symbol in the minimal bitmap
pub const QUIET_ZONE_MODULES: u32 = 4;

/// Frames larger than this are downscaled before live detection
pub const LIVE_DETECTION_MAX_DIMENSION: u32 = 640;

/// Screen bounds used when no configuration overrides them (points)
pub const DEFAULT_SCREEN_WIDTH: f64 = 375.0;
pub const DEFAULT_SCREEN_HEIGHT: f64 = 667.0;

/// Pending detection events kept per session before new ones are dropped
pub const DEFAULT_EVENT_QUEUE_DEPTH: usize = 32;

/// Frame pacing of the virtual camera
pub mod virtual_camera {
    use super::Duration;

    /// Default frame interval (~15 fps)
    pub const FRAME_INTERVAL: Duration = Duration::from_millis(66);

    /// Virtual sensor size; still images are letterboxed into it
    pub const SENSOR_WIDTH: u32 = 640;
    pub const SENSOR_HEIGHT: u32 = 480;
}

/// Application identifier, used for the config directory name
pub const APP_ID: &str = "qrscan";
