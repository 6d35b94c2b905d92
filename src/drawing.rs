// SPDX-License-Identifier: GPL-3.0-only

//! Stroking helpers for RGBA canvases
//!
//! Strokes are centered on the path, so half the line width falls outside
//! the shape. Everything uses a top-left origin.

use crate::geometry::{Point, Rect};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as PixelRect;

/// Stroke the outline of `rect` with the given line width
pub fn stroke_rect(canvas: &mut RgbaImage, rect: Rect, line_width: u32, color: Rgba<u8>) {
    let x = rect.x.round() as i32;
    let y = rect.y.round() as i32;
    let w = rect.width.round().max(0.0) as i32;
    let h = rect.height.round().max(0.0) as i32;

    // Positive offsets grow the ring outwards
    let outer = (line_width / 2) as i32;
    let inner = line_width as i32 - 1 - outer;

    for offset in -inner..=outer {
        let width = w + 2 * offset;
        let height = h + 2 * offset;
        if width <= 0 || height <= 0 {
            continue;
        }
        let ring = PixelRect::at(x - offset, y - offset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, ring, color);
    }
}

/// Stroke a closed polygon through `points`
pub fn stroke_closed_polyline(
    canvas: &mut RgbaImage,
    points: &[Point],
    line_width: f32,
    color: Rgba<u8>,
) {
    if points.len() < 2 {
        return;
    }

    for (i, start) in points.iter().enumerate() {
        let end = points[(i + 1) % points.len()];
        stroke_segment(canvas, *start, end, line_width, color);
    }
}

/// Draw a thick segment as a bundle of parallel one-pixel lines
fn stroke_segment(canvas: &mut RgbaImage, start: Point, end: Point, line_width: f32, color: Rgba<u8>) {
    let dx = (end.x - start.x) as f32;
    let dy = (end.y - start.y) as f32;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return;
    }

    let (nx, ny) = (-dy / length, dx / length);
    let half = line_width.max(1.0) / 2.0;
    let mut t = -half;
    while t <= half {
        let from = (start.x as f32 + nx * t, start.y as f32 + ny * t);
        let to = (end.x as f32 + nx * t, end.y as f32 + ny * t);
        draw_line_segment_mut(canvas, from, to, color);
        t += 0.5;
    }
}
