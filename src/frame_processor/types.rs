// SPDX-License-Identifier: MPL-2.0

//! Core types for frame processing results

use crate::geometry::{Point, Rect};

/// Kinds of machine-readable objects a metadata output can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataObjectType {
    Qr,
}

/// A QR symbol found in an image, in that image's pixel coordinates
///
/// Corners go around the symbol (top-left, top-right, bottom-right,
/// bottom-left as seen in the symbol's own orientation).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedSymbol {
    pub corners: [Point; 4],
    /// Decoded text, `None` if the symbol was found but could not be read
    pub text: Option<String>,
}

impl DetectedSymbol {
    /// Axis-aligned bounding box of the corners
    pub fn bounds(&self) -> Rect {
        Rect::bounding(&self.corners).unwrap_or_default()
    }
}

/// A machine-readable object delivered by a metadata output
///
/// Geometry is in normalized detection space (0.0 to 1.0 relative to the
/// sensor frame, before any rotation to view orientation).
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataObject {
    pub object_type: MetadataObjectType,
    pub text: Option<String>,
    pub corners: [Point; 4],
    pub bounds: Rect,
}

impl MetadataObject {
    /// Normalize a pixel-space symbol against the frame it was found in
    pub fn from_symbol(symbol: DetectedSymbol, frame_width: u32, frame_height: u32) -> Self {
        let w = frame_width.max(1) as f64;
        let h = frame_height.max(1) as f64;
        let corners = symbol.corners.map(|p| Point::new(p.x / w, p.y / h));
        let bounds = Rect::bounding(&corners).unwrap_or_default();

        Self {
            object_type: MetadataObjectType::Qr,
            text: symbol.text,
            corners,
            bounds,
        }
    }

    /// Decoded text, or an empty string for an unreadable symbol
    pub fn string_value(&self) -> String {
        self.text.clone().unwrap_or_default()
    }
}
