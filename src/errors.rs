// SPDX-License-Identifier: MPL-2.0

//! Error types for scan sessions and the image codec

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Scan session errors
    Scan(ScanError),
    /// QR image generation/decoding errors
    Codec(CodecError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Scan session errors
#[derive(Debug, Clone)]
pub enum ScanError {
    /// No back-facing camera could be found or opened
    DeviceUnavailable,
    /// The device refused the exclusive configuration lock
    ConfigurationLockFailed(String),
    /// The session was closed and can no longer be used
    SessionClosed,
    /// Session settings are out of range
    InvalidConfiguration(String),
    /// Error reported by the camera backend
    Backend(BackendError),
}

/// QR image codec errors
#[derive(Debug, Clone)]
pub enum CodecError {
    /// The text could not be encoded into a QR symbol
    Encode(String),
    /// A size or scale parameter is out of range
    InvalidParameter(String),
    /// Image loading or saving failed
    Image(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Scan(e) => write!(f, "Scan error: {}", e),
            AppError::Codec(e) => write!(f, "Codec error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::DeviceUnavailable => write!(f, "No back-facing camera available"),
            ScanError::ConfigurationLockFailed(msg) => {
                write!(f, "Failed to lock device for configuration: {}", msg)
            }
            ScanError::SessionClosed => write!(f, "Scan session is closed"),
            ScanError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            ScanError::Backend(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Encode(msg) => write!(f, "Failed to encode QR symbol: {}", msg),
            CodecError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            CodecError::Image(msg) => write!(f, "Image error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ScanError {}
impl std::error::Error for CodecError {}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        AppError::Scan(err)
    }
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        AppError::Codec(err)
    }
}

impl From<BackendError> for ScanError {
    fn from(err: BackendError) -> Self {
        ScanError::Backend(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Scan(ScanError::Backend(err))
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for CodecError {
    fn from(err: image::ImageError) -> Self {
        CodecError::Image(err.to_string())
    }
}

impl From<qrcode::types::QrError> for CodecError {
    fn from(err: qrcode::types::QrError) -> Self {
        CodecError::Encode(err.to_string())
    }
}
