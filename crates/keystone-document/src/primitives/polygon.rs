// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Polygon helpers for traced contours: enclosed area, closed arc length and
// conversion to the `imageproc` point type.

use imageproc::geometry::arc_length;
use imageproc::point::Point as PixelPoint;
use keystone_core::Point;

/// Contour points in the form `imageproc::geometry` consumes.
pub fn to_pixel_points(points: &[Point]) -> Vec<PixelPoint<f32>> {
    points.iter().map(|p| PixelPoint::new(p.x, p.y)).collect()
}

pub fn from_pixel_points(points: &[PixelPoint<f32>]) -> Vec<Point> {
    points.iter().map(|p| Point::new(p.x, p.y)).collect()
}

/// Length of the closed polyline through `points`.
pub fn perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    arc_length(&to_pixel_points(points), true)
}

/// Absolute area enclosed by `points` (shoelace formula).
pub fn area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0f64;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        twice += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    twice.abs() / 2.0
}
