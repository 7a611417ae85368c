// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! Distances, hit testing and arrow rotation in frame coordinates, plus the
//! transform between screen (widget) coordinates and frame pixels.

use crate::models::annotation::Point;

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// True when `point` lies within `radius` of `target` (inclusive).
pub fn hit_test(point: Point, target: Point, radius: f64) -> bool {
    distance(point, target) <= radius
}

/// Rotate `head` around `start` by `angle_deg`, keeping the distance between
/// them.
///
/// Positive angles turn the vector from +x toward +y, which on a y-down
/// screen is clockwise. Callers rotating in small steps should pass the total
/// angle relative to a fixed original head instead of feeding the result back
/// in, so the radius never drifts.
pub fn rotate(head: Point, start: Point, angle_deg: f64) -> Point {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let dx = head.x - start.x;
    let dy = head.y - start.y;
    Point {
        x: start.x + dx * cos - dy * sin,
        y: start.y + dx * sin + dy * cos,
    }
}

/// Heading of the vector `start -> head` in degrees, measured from +x toward +y.
pub fn heading_deg(start: Point, head: Point) -> f64 {
    (head.y - start.y).atan2(head.x - start.x).to_degrees()
}

/// Mapping between screen coordinates and frame pixel coordinates.
///
/// A frame is displayed at a uniform `scale` with its top-left corner at
/// `(offset_x, offset_y)` on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
        }
    }
}

impl FrameTransform {
    /// Fit a `frame_width` x `frame_height` frame inside a viewport, keeping
    /// the aspect ratio and centering it.
    pub fn fit(
        frame_width: u32,
        frame_height: u32,
        viewport_x: f64,
        viewport_y: f64,
        viewport_width: f64,
        viewport_height: f64,
    ) -> Self {
        if frame_width == 0 || frame_height == 0 {
            return Self::default();
        }
        let scale = (viewport_width / frame_width as f64).min(viewport_height / frame_height as f64);
        let display_width = frame_width as f64 * scale;
        let display_height = frame_height as f64 * scale;
        Self {
            offset_x: viewport_x + (viewport_width - display_width) / 2.0,
            offset_y: viewport_y + (viewport_height - display_height) / 2.0,
            scale,
        }
    }

    /// Convert screen coordinates to frame pixel coordinates.
    pub fn to_frame(&self, screen_x: f64, screen_y: f64) -> Point {
        Point {
            x: (screen_x - self.offset_x) / self.scale,
            y: (screen_y - self.offset_y) / self.scale,
        }
    }

    /// Convert frame pixel coordinates to screen coordinates.
    pub fn to_screen(&self, point: Point) -> (f64, f64) {
        (
            self.offset_x + point.x * self.scale,
            self.offset_y + point.y * self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_quarter_turn() {
        let start = Point::new(0.0, 0.0);
        let head = Point::new(10.0, 0.0);

        let rotated = rotate(head, start, 90.0);

        assert!(rotated.x.abs() < 1e-9);
        assert!((rotated.y - 10.0).abs() < 1e-9);
        assert!((distance(start, rotated) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotate_roundtrip() {
        let start = Point::new(120.5, 64.0);
        let head = Point::new(180.0, 20.25);

        let there = rotate(head, start, 7.0);
        let back = rotate(there, start, -7.0);

        assert!((back.x - head.x).abs() < 1e-9);
        assert!((back.y - head.y).abs() < 1e-9);
    }

    #[test]
    fn test_rotate_from_fixed_head_keeps_radius() {
        let start = Point::new(3.0, 4.0);
        let head = Point::new(40.0, -12.0);
        let radius = distance(start, head);

        for step in 1..=3600 {
            let rotated = rotate(head, start, step as f64);
            assert!((distance(start, rotated) - radius).abs() < 1e-9);
        }
    }

    #[test]
    fn test_heading() {
        let start = Point::new(0.0, 0.0);
        assert!((heading_deg(start, Point::new(0.0, 5.0)) - 90.0).abs() < 1e-9);
        assert!((heading_deg(start, Point::new(-5.0, 0.0)).abs() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_test_boundary() {
        let target = Point::new(10.0, 10.0);
        assert!(hit_test(Point::new(18.0, 10.0), target, 8.0));
        assert!(!hit_test(Point::new(18.1, 10.0), target, 8.0));
    }

    #[test]
    fn test_transform_roundtrip() {
        let transform = FrameTransform::fit(1920, 1080, 0.0, 40.0, 960.0, 720.0);
        let frame_point = Point::new(960.0, 540.0);

        let (sx, sy) = transform.to_screen(frame_point);
        let back = transform.to_frame(sx, sy);

        assert!((back.x - frame_point.x).abs() < 0.0001);
        assert!((back.y - frame_point.y).abs() < 0.0001);
    }

    #[test]
    fn test_fit_letterboxes_wide_frame() {
        let transform = FrameTransform::fit(200, 100, 0.0, 0.0, 100.0, 100.0);

        assert_eq!(transform.scale, 0.5);
        assert_eq!(transform.offset_x, 0.0);
        assert_eq!(transform.offset_y, 25.0);

        // Top-left and bottom-right corners of the frame
        assert_eq!(transform.to_frame(0.0, 25.0), Point::new(0.0, 0.0));
        assert_eq!(transform.to_frame(100.0, 75.0), Point::new(200.0, 100.0));
    }
}
