// SPDX-License-Identifier: GPL-3.0-only

//! Input/output wiring of a scan session

use super::metadata_output::MetadataOutput;
use crate::backends::camera::types::CameraDevice;
use std::sync::Arc;
use tracing::debug;

/// A camera device attached to a capture session
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureInput {
    pub device: CameraDevice,
}

impl CaptureInput {
    pub fn new(device: CameraDevice) -> Self {
        Self { device }
    }
}

/// Inputs and outputs connected to one camera pipeline
///
/// Adding an input for a device that is already attached, or an output that is
/// already attached, is refused; callers check with `can_add_*` first.
#[derive(Debug, Default)]
pub struct CaptureSession {
    inputs: Vec<CaptureInput>,
    outputs: Vec<Arc<MetadataOutput>>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_add_input(&self, input: &CaptureInput) -> bool {
        !self
            .inputs
            .iter()
            .any(|existing| existing.device.path == input.device.path)
    }

    /// Attach an input; returns false if it was already attached
    pub fn add_input(&mut self, input: CaptureInput) -> bool {
        if !self.can_add_input(&input) {
            return false;
        }
        debug!(device = %input.device.name, "Input added to capture session");
        self.inputs.push(input);
        true
    }

    pub fn can_add_output(&self, output: &Arc<MetadataOutput>) -> bool {
        !self.outputs.iter().any(|existing| Arc::ptr_eq(existing, output))
    }

    /// Attach an output; returns false if it was already attached
    pub fn add_output(&mut self, output: Arc<MetadataOutput>) -> bool {
        if !self.can_add_output(&output) {
            return false;
        }
        debug!("Metadata output added to capture session");
        self.outputs.push(output);
        true
    }

    pub fn inputs(&self) -> &[CaptureInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Arc<MetadataOutput>] {
        &self.outputs
    }

    pub fn is_wired(&self) -> bool {
        !self.inputs.is_empty() && !self.outputs.is_empty()
    }

    /// Detach every input and output
    pub fn remove_all(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }
}
