// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Software camera replaying still images
    #[default]
    Virtual,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::Virtual => write!(f, "virtual"),
        }
    }
}

/// Which way a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraPosition {
    /// Facing away from the user (the scanning camera)
    #[default]
    Back,
    /// Facing the user
    Front,
    /// Externally attached, facing unknown
    External,
}

impl std::fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraPosition::Back => write!(f, "back"),
            CameraPosition::Front => write!(f, "front"),
            CameraPosition::External => write!(f, "external"),
        }
    }
}

/// Sensor rotation in degrees (clockwise)
///
/// Camera sensors may be physically mounted at various angles relative to the device.
/// Phone back cameras are usually mounted at 90°, which is why detection space
/// and view space have swapped axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorRotation {
    /// No rotation (sensor is oriented correctly)
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    pub fn from_degrees_int(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, SensorRotation::Rotate90 | SensorRotation::Rotate270)
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Torch (continuous flash LED) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TorchMode {
    #[default]
    Off,
    On,
}

impl From<bool> for TorchMode {
    fn from(on: bool) -> Self {
        if on { TorchMode::On } else { TorchMode::Off }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq)]
pub struct CameraDevice {
    pub name: String,
    /// Backend-specific identifier
    pub path: String,
    pub position: CameraPosition,
    /// Sensor mounting rotation relative to the screen
    pub rotation: SensorRotation,
    /// Device has a flash LED usable for still capture
    pub has_flash: bool,
    /// Device has a torch (continuous illumination) unit
    pub has_torch: bool,
}

/// A single RGBA frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, `stride` bytes per row
    pub data: Arc<[u8]>,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Monotonic frame counter assigned by the device
    pub sequence: u64,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap a tightly packed RGBA image as a frame
    pub fn from_rgba(image: RgbaImage, sequence: u64) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Arc::from(image.into_raw().into_boxed_slice()),
            stride: width * 4,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Copy the frame into an RGBA image, dropping any stride padding
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let width = self.width as usize;
        let stride = self.stride as usize;
        let row_bytes = width * 4;

        if stride < row_bytes {
            return None;
        }

        let mut pixels = Vec::with_capacity(row_bytes * self.height as usize);
        for y in 0..self.height as usize {
            let row_start = y * stride;
            let row = self.data.get(row_start..row_start + row_bytes)?;
            pixels.extend_from_slice(row);
        }

        RgbaImage::from_raw(self.width, self.height, pixels)
    }

    /// Same frame with a new sequence number and capture time
    pub fn restamped(&self, sequence: u64) -> Self {
        Self {
            data: Arc::clone(&self.data),
            sequence,
            captured_at: Instant::now(),
            ..*self
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Failed to open the device
    InitializationFailed(String),
    /// The device configuration lock is held elsewhere
    ConfigurationLocked(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::ConfigurationLocked(msg) => write!(f, "Configuration locked: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_rgba_image_drops_stride_padding() {
        let data: Vec<u8> = vec![
            255, 0, 0, 255, // Red pixel
            0, 255, 0, 255, // Green pixel
            0, 0,           // stride padding
            0, 0, 255, 255, // Blue pixel
            255, 255, 255, 255, // White pixel
            0, 0,           // stride padding
        ];

        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data.as_slice()),
            stride: 10,
            sequence: 0,
            captured_at: Instant::now(),
        };

        let image = frame.to_rgba_image().unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 255, 0, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [0, 0, 255, 255]);
        assert_eq!(image.get_pixel(1, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(vec![0u8; 12].as_slice()),
            stride: 8,
            sequence: 0,
            captured_at: Instant::now(),
        };
        assert!(frame.to_rgba_image().is_none());
    }

    #[test]
    fn test_sensor_rotation_from_degrees() {
        assert_eq!(SensorRotation::from_degrees_int(90), SensorRotation::Rotate90);
        assert_eq!(SensorRotation::from_degrees_int(-90), SensorRotation::Rotate270);
        assert_eq!(SensorRotation::from_degrees_int(45), SensorRotation::None);
        assert!(SensorRotation::Rotate270.swaps_dimensions());
        assert!(!SensorRotation::Rotate180.swaps_dimensions());
    }
}
