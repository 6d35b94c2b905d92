// SPDX-License-Identifier: GPL-3.0-only

//! Preview layer, overlay shapes and host surfaces
//!
//! The preview layer shows the latest camera frame in view orientation and
//! carries one shape layer per outlined symbol. Detection-space points are
//! mapped into layer coordinates in two steps: undo the sensor rotation, then
//! place the upright frame inside the layer according to the video gravity.

use crate::backends::camera::types::{CameraFrame, SensorRotation};
use crate::constants::{HIGHLIGHT_COLOR, PREVIEW_OUTLINE_WIDTH};
use crate::drawing;
use crate::geometry::{Point, Rect, Size};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of a layer inside a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(Uuid);

impl LayerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a host surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

/// How the camera frame is fitted into the layer bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoGravity {
    /// Keep aspect ratio and fill the layer, cropping the overflow
    #[default]
    ResizeAspectFill,
    /// Keep aspect ratio and fit inside the layer (letterbox)
    ResizeAspect,
    /// Stretch to the layer bounds
    Resize,
}

/// A vector shape drawn over the preview
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeLayer {
    /// Path in preview-layer coordinates
    pub path: Vec<Point>,
    pub closed: bool,
    pub stroke_color: Rgba<u8>,
    /// `None` is a clear fill
    pub fill_color: Option<Rgba<u8>>,
    pub line_width: f32,
}

impl ShapeLayer {
    /// Red closed outline through `points`, as drawn around detected symbols
    pub fn outline(points: Vec<Point>) -> Self {
        Self {
            path: points,
            closed: true,
            stroke_color: HIGHLIGHT_COLOR,
            fill_color: None,
            line_width: PREVIEW_OUTLINE_WIDTH,
        }
    }

    fn render(&self, canvas: &mut RgbaImage) {
        if self.closed {
            drawing::stroke_closed_polyline(canvas, &self.path, self.line_width, self.stroke_color);
        } else {
            for pair in self.path.windows(2) {
                drawing::stroke_closed_polyline(canvas, pair, self.line_width, self.stroke_color);
            }
        }
    }
}

/// Live camera preview
#[derive(Debug, Clone)]
pub struct PreviewLayer {
    id: LayerId,
    frame: Rect,
    gravity: VideoGravity,
    rotation: SensorRotation,
    latest_frame: Option<CameraFrame>,
    shapes: Vec<ShapeLayer>,
    /// Surface currently showing the layer; a layer has at most one host
    host: Option<SurfaceId>,
}

/// Preview layer shared between a session, its capture thread and a surface
pub type SharedPreviewLayer = Arc<Mutex<PreviewLayer>>;

impl PreviewLayer {
    /// Empty preview for a sensor mounted at `rotation`
    pub fn new(rotation: SensorRotation) -> Self {
        Self {
            id: LayerId::new(),
            frame: Rect::default(),
            gravity: VideoGravity::default(),
            rotation,
            latest_frame: None,
            shapes: Vec::new(),
            host: None,
        }
    }

    pub fn shared(self) -> SharedPreviewLayer {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Layer bounds in surface coordinates
    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    pub fn gravity(&self) -> VideoGravity {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: VideoGravity) {
        self.gravity = gravity;
    }

    pub fn host(&self) -> Option<SurfaceId> {
        self.host
    }

    /// Record the surface showing this layer; surfaces call this on insert
    /// and removal
    pub fn set_host(&mut self, host: Option<SurfaceId>) {
        self.host = host;
    }

    pub fn rotation(&self) -> SensorRotation {
        self.rotation
    }

    pub fn latest_frame(&self) -> Option<&CameraFrame> {
        self.latest_frame.as_ref()
    }

    pub fn set_latest_frame(&mut self, frame: CameraFrame) {
        self.latest_frame = Some(frame);
    }

    pub fn shapes(&self) -> &[ShapeLayer] {
        &self.shapes
    }

    pub fn add_shape(&mut self, shape: ShapeLayer) {
        self.shapes.push(shape);
    }

    /// Remove all shape sublayers, returning how many there were
    pub fn clear_shapes(&mut self) -> usize {
        let count = self.shapes.len();
        self.shapes.clear();
        count
    }

    /// Size of a sensor frame once rotated to view orientation
    pub fn upright_size(&self, frame_size: (u32, u32)) -> Size {
        let (width, height) = frame_size;
        if self.rotation.swaps_dimensions() {
            Size::new(height as f64, width as f64)
        } else {
            Size::new(width as f64, height as f64)
        }
    }

    /// Where the upright frame lands inside the layer, in layer coordinates
    pub fn video_rect(&self, frame_size: (u32, u32)) -> Rect {
        let video = self.upright_size(frame_size);
        let (layer_width, layer_height) = (self.frame.width, self.frame.height);

        if video.width <= 0.0 || video.height <= 0.0 {
            return Rect::new(0.0, 0.0, layer_width, layer_height);
        }

        let scale = match self.gravity {
            VideoGravity::Resize => return Rect::new(0.0, 0.0, layer_width, layer_height),
            VideoGravity::ResizeAspect => {
                (layer_width / video.width).min(layer_height / video.height)
            }
            VideoGravity::ResizeAspectFill => {
                (layer_width / video.width).max(layer_height / video.height)
            }
        };

        let width = video.width * scale;
        let height = video.height * scale;
        Rect::new(
            (layer_width - width) / 2.0,
            (layer_height - height) / 2.0,
            width,
            height,
        )
    }

    /// Map a normalized detection-space point into layer coordinates
    pub fn transform_point(&self, point: Point, frame_size: (u32, u32)) -> Point {
        let upright = rotate_to_view(point, self.rotation);
        let video = self.video_rect(frame_size);
        Point::new(
            video.x + upright.x * video.width,
            video.y + upright.y * video.height,
        )
    }

    /// Draw the latest frame and the shapes onto `canvas`
    ///
    /// `canvas` uses surface coordinates; drawing is clipped to the layer frame.
    pub fn render(&self, canvas: &mut RgbaImage) {
        let width = self.frame.width.round().max(0.0) as u32;
        let height = self.frame.height.round().max(0.0) as u32;
        if width == 0 || height == 0 {
            return;
        }

        let mut layer = RgbaImage::new(width, height);

        if let Some(frame) = &self.latest_frame
            && let Some(image) = frame.to_rgba_image()
        {
            let upright = match self.rotation {
                SensorRotation::None => image,
                SensorRotation::Rotate90 => imageops::rotate90(&image),
                SensorRotation::Rotate180 => imageops::rotate180(&image),
                SensorRotation::Rotate270 => imageops::rotate270(&image),
            };
            let video = self.video_rect((frame.width, frame.height));
            let scaled = imageops::resize(
                &upright,
                video.width.round().max(1.0) as u32,
                video.height.round().max(1.0) as u32,
                FilterType::Triangle,
            );
            imageops::overlay(
                &mut layer,
                &scaled,
                video.x.round() as i64,
                video.y.round() as i64,
            );
        }

        for shape in &self.shapes {
            shape.render(&mut layer);
        }

        imageops::overlay(
            canvas,
            &layer,
            self.frame.x.round() as i64,
            self.frame.y.round() as i64,
        );
    }
}

/// Undo the sensor rotation of a normalized point
///
/// Matches rotating the frame image clockwise by the mounting angle.
fn rotate_to_view(point: Point, rotation: SensorRotation) -> Point {
    match rotation {
        SensorRotation::None => point,
        SensorRotation::Rotate90 => Point::new(1.0 - point.y, point.x),
        SensorRotation::Rotate180 => Point::new(1.0 - point.x, 1.0 - point.y),
        SensorRotation::Rotate270 => Point::new(point.y, 1.0 - point.x),
    }
}

/// A host view that preview layers can be inserted into
///
/// Inserting a layer moves it: a surface no longer shows a layer once another
/// surface has taken it over.
pub trait PreviewSurface {
    /// Surface bounds in points
    fn bounds(&self) -> Rect;

    fn contains_layer(&self, id: LayerId) -> bool;

    /// Insert below every existing layer, taking it from any previous host
    fn insert_layer_at_bottom(&mut self, layer: SharedPreviewLayer);

    /// Remove a layer; returns false if it was not there
    fn remove_layer(&mut self, id: LayerId) -> bool;
}

/// A surface that renders into an in-memory RGBA image
pub struct OffscreenSurface {
    id: SurfaceId,
    bounds: Rect,
    background: Rgba<u8>,
    /// Bottom layer first
    layers: Vec<(LayerId, SharedPreviewLayer)>,
}

impl OffscreenSurface {
    pub fn new(size: Size) -> Self {
        Self {
            id: SurfaceId::new(),
            bounds: Rect::from_size(size),
            background: Rgba([0, 0, 0, 255]),
            layers: Vec::new(),
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Layers still hosted here, bottom first
    fn hosted(&self) -> impl Iterator<Item = &(LayerId, SharedPreviewLayer)> {
        self.layers
            .iter()
            .filter(|(_, layer)| layer.lock().host() == Some(self.id))
    }

    pub fn layer_count(&self) -> usize {
        self.hosted().count()
    }

    /// Composite all layers, bottom to top
    pub fn render(&self) -> RgbaImage {
        let width = self.bounds.width.round().max(1.0) as u32;
        let height = self.bounds.height.round().max(1.0) as u32;
        let mut canvas = RgbaImage::from_pixel(width, height, self.background);

        for (_, layer) in self.hosted() {
            layer.lock().render(&mut canvas);
        }
        canvas
    }
}

impl PreviewSurface for OffscreenSurface {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn contains_layer(&self, id: LayerId) -> bool {
        self.hosted().any(|(layer_id, _)| *layer_id == id)
    }

    fn insert_layer_at_bottom(&mut self, layer: SharedPreviewLayer) {
        let id = {
            let mut guard = layer.lock();
            guard.set_host(Some(self.id));
            guard.id()
        };
        // Drop layers other surfaces took over, and an earlier entry for this one
        let surface = self.id;
        self.layers.retain(|(layer_id, existing)| {
            *layer_id != id && existing.lock().host() == Some(surface)
        });
        self.layers.insert(0, (id, layer));
    }

    fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(index) = self.layers.iter().position(|(layer_id, _)| *layer_id == id) else {
            return false;
        };
        let (_, layer) = self.layers.remove(index);
        let mut layer = layer.lock();
        if layer.host() == Some(self.id) {
            layer.set_host(None);
            true
        } else {
            false
        }
    }
}
