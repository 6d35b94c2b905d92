// SPDX-License-Identifier: GPL-3.0-only

//! Metadata output stage
//!
//! Runs the QR detector on captured frames and reports the objects that fall
//! inside the rect of interest. Everything here is in detection space.

use crate::backends::camera::types::CameraFrame;
use crate::frame_processor::{MetadataObject, MetadataObjectType, QrDetector};
use crate::geometry::Rect;
use parking_lot::Mutex;
use tracing::trace;

#[derive(Debug)]
struct OutputSettings {
    object_types: Vec<MetadataObjectType>,
    rect_of_interest: Rect,
}

/// Detection stage attached to a capture session
///
/// Reports nothing until object types are set. The rect of interest starts
/// as the whole frame.
#[derive(Debug)]
pub struct MetadataOutput {
    detector: QrDetector,
    settings: Mutex<OutputSettings>,
}

impl MetadataOutput {
    pub fn new(detector: QrDetector) -> Self {
        Self {
            detector,
            settings: Mutex::new(OutputSettings {
                object_types: Vec::new(),
                rect_of_interest: Rect::UNIT,
            }),
        }
    }

    pub fn object_types(&self) -> Vec<MetadataObjectType> {
        self.settings.lock().object_types.clone()
    }

    pub fn set_object_types(&self, types: &[MetadataObjectType]) {
        self.settings.lock().object_types = types.to_vec();
    }

    pub fn rect_of_interest(&self) -> Rect {
        self.settings.lock().rect_of_interest
    }

    pub fn set_rect_of_interest(&self, rect: Rect) {
        self.settings.lock().rect_of_interest = rect;
    }

    /// Detect objects in `frame`, in detection order
    ///
    /// An object is kept when the center of its bounding box lies inside the
    /// rect of interest.
    pub fn process(&self, frame: &CameraFrame) -> Vec<MetadataObject> {
        let (wants_qr, roi) = {
            let settings = self.settings.lock();
            (
                settings.object_types.contains(&MetadataObjectType::Qr),
                settings.rect_of_interest,
            )
        };
        if !wants_qr {
            return Vec::new();
        }

        self.detector
            .detect_frame(frame)
            .into_iter()
            .filter(|object| {
                let inside = roi.contains(object.bounds.center());
                if !inside {
                    trace!(bounds = ?object.bounds, ?roi, "Object outside rect of interest");
                }
                inside
            })
            .collect()
    }
}
