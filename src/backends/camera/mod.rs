// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! This module provides the trait-based seam between scan sessions and
//! whatever camera stack produces frames.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │     ScanSession     │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Device discovery
//! └──────────┬──────────┘
//!            │ open_device
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureDevice Trait │  ← Frames, torch, configuration lock
//! └──────────┬──────────┘
//!            │
//!            ▼
//!       ┌─────────┐
//!       │ Virtual │  ← Concrete implementation
//!       └─────────┘
//! ```

pub mod frame_loop;
pub mod types;

pub use frame_loop::{CaptureLoopController, LoopAction};
pub use types::*;

use std::sync::Arc;
use tracing::debug;

/// Camera backend trait
///
/// Backends enumerate the cameras they know about and open them for capture.
pub trait CameraBackend: Send + Sync {
    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Open a device for capture
    fn open_device(&self, device: &CameraDevice) -> BackendResult<Arc<dyn CaptureDevice>>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// First enumerated camera facing the given way
    fn default_device(&self, position: CameraPosition) -> Option<CameraDevice> {
        self.enumerate_cameras()
            .into_iter()
            .find(|device| device.position == position)
    }
}

/// An opened camera device
///
/// Frames are pulled by the session's capture thread; configuration changes
/// (torch) must happen between `lock_for_configuration` and
/// `unlock_for_configuration`, which [`ConfigurationLock`] takes care of.
pub trait CaptureDevice: Send + Sync {
    /// Static description of the device
    fn info(&self) -> &CameraDevice;

    /// Whether the device has a torch unit
    fn has_torch(&self) -> bool {
        self.info().has_torch
    }

    /// Current torch mode
    fn torch_mode(&self) -> TorchMode;

    /// Acquire exclusive configuration access
    fn lock_for_configuration(&self) -> BackendResult<()>;

    /// Release exclusive configuration access
    fn unlock_for_configuration(&self);

    /// Whether configuration access is currently held
    fn is_configuration_locked(&self) -> bool;

    /// Change the torch mode; requires the configuration lock
    fn set_torch_mode(&self, mode: TorchMode) -> BackendResult<()>;

    /// Block until the next frame is available
    ///
    /// Returns `Ok(None)` when the device has no more frames to deliver.
    fn read_frame(&self) -> BackendResult<Option<CameraFrame>>;
}

/// Scoped configuration access to a device
///
/// The lock is acquired in [`ConfigurationLock::acquire`] and released when
/// the guard is dropped, whatever happens in between.
pub struct ConfigurationLock<'a> {
    device: &'a dyn CaptureDevice,
}

impl<'a> ConfigurationLock<'a> {
    pub fn acquire(device: &'a dyn CaptureDevice) -> BackendResult<Self> {
        device.lock_for_configuration()?;
        debug!(device = %device.info().name, "Configuration lock acquired");
        Ok(Self { device })
    }

    /// Change the torch mode while holding the lock
    pub fn set_torch_mode(&self, mode: TorchMode) -> BackendResult<()> {
        self.device.set_torch_mode(mode)
    }
}

impl Drop for ConfigurationLock<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
        debug!(device = %self.device.info().name, "Configuration lock released");
    }
}
