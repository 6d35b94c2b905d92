// SPDX-License-Identifier: MPL-2.0

//! Frame processor module
//!
//! Finds QR symbols in camera frames and still images. Live scanning and
//! still-image decoding share the same detector; they differ only in how
//! much the input is downscaled and in which space results are reported.

pub mod qr_detector;
pub mod types;

pub use qr_detector::QrDetector;
pub use types::{DetectedSymbol, MetadataObject, MetadataObjectType};
