// SPDX-License-Identifier: MPL-2.0

//! qrscan - QR code scan sessions and QR image generation/decoding
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`scanner`]: Scan sessions wiring a camera to QR detection, a preview
//!   layer and a result handler
//! - [`codec`]: QR image generation and still-image decoding
//! - [`backends`]: Camera backend abstraction and the virtual camera
//! - [`frame_processor`]: QR detection on frames and images
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let backend = VirtualCameraBackend::new()
//!     .with_camera(VirtualCamera::back("Back").with_scenes(&[code]));
//! let mut session = ScanSession::open(&backend, &Config::default())?;
//! let mut surface = OffscreenSurface::new(Size::new(375.0, 667.0));
//! let _sub = session.start_scan(&mut surface, true, |strings: &[String]| {
//!     println!("{:?}", strings);
//! })?;
//! session.dispatch_next().await;
//! ```

pub mod backends;
pub mod codec;
pub mod config;
pub mod constants;
pub mod drawing;
pub mod errors;
pub mod frame_processor;
pub mod geometry;
pub mod scanner;

// Re-export commonly used types
pub use backends::camera::{CameraBackend, CaptureDevice};
pub use backends::virtual_camera::{VirtualCamera, VirtualCameraBackend};
pub use codec::{DecodeOutput, GenerateRequest, QrCodec, Scale};
pub use config::Config;
pub use errors::{AppError, AppResult, CodecError, ScanError};
pub use geometry::{Point, Rect, Size};
pub use scanner::{OffscreenSurface, PreviewSurface, ScanSession, Subscription};
