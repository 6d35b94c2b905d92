// SPDX-License-Identifier: MPL-2.0

//! Points, sizes and rectangles shared by view space and detection space
//!
//! View space is measured in screen points with the origin at the top-left.
//! Detection space is the normalized (0.0 to 1.0) coordinate space of the
//! camera sensor, which is rotated relative to view space on devices whose
//! sensor is mounted sideways.

use serde::{Deserialize, Serialize};

/// A point in either view or detection space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Swap the two axes (transpose)
    pub fn transposed(self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }
}

/// A width/height pair
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// The unit rectangle covering the whole detection space
    pub const UNIT: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle with its origin at (0, 0)
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }

    /// Smallest rectangle enclosing all `points`, or `None` for an empty slice
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Mirror the rectangle vertically inside a container of the given height
    ///
    /// Converts between a bottom-left origin (y up) and a top-left origin
    /// (y down). Applying it twice yields the original rectangle.
    pub fn flipped_vertically(&self, container_height: f64) -> Self {
        Self::new(
            self.x,
            container_height - self.y - self.height,
            self.width,
            self.height,
        )
    }
}

/// Normalize a view-space rectangle into the detection-space rect of interest
///
/// The sensor is rotated 90° against the screen, so the axes are swapped:
/// the result is `(y / H, x / W, height / H, width / W)` for screen bounds
/// `W x H`.
pub fn rect_of_interest(view_rect: Rect, screen: Size) -> Rect {
    let x_ratio = view_rect.x / screen.width;
    let y_ratio = view_rect.y / screen.height;
    let w_ratio = view_rect.width / screen.width;
    let h_ratio = view_rect.height / screen.height;
    Rect::new(y_ratio, x_ratio, h_ratio, w_ratio)
}
