// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canonical corner ordering.

use keystone_core::{Point, Quad};

/// Order four points as `[top_left, top_right, bottom_right, bottom_left]`.
///
/// Classification is closed-form: the top-left corner has the smallest
/// `x + y`, the bottom-right the largest; the top-right has the smallest
/// `y - x`, the bottom-left the largest. Ties resolve to the earliest input.
///
/// ## Limitations
///
/// Correct for convex quadrilaterals facing the camera roughly square-on.
/// Shapes rotated by more than about 45° or self-intersecting inputs can be
/// misclassified, and duplicate points may land in more than one slot. Such
/// inputs are returned as classified, not repaired.
pub fn canonicalize(points: [Point; 4]) -> Quad {
    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.y - p.x;

    let top_left = points[extreme_index(&points, sum, Extreme::Min)];
    let bottom_right = points[extreme_index(&points, sum, Extreme::Max)];
    let top_right = points[extreme_index(&points, diff, Extreme::Min)];
    let bottom_left = points[extreme_index(&points, diff, Extreme::Max)];

    Quad::new([top_left, top_right, bottom_right, bottom_left])
}

#[derive(Debug, Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

/// Index of the first point minimising / maximising `key`.
fn extreme_index(points: &[Point; 4], key: impl Fn(&Point) -> f32, extreme: Extreme) -> usize {
    let mut best = 0;
    let mut best_value = key(&points[0]);
    for (i, point) in points.iter().enumerate().skip(1) {
        let value = key(point);
        let better = match extreme {
            Extreme::Min => value < best_value,
            Extreme::Max => value > best_value,
        };
        if better {
            best = i;
            best_value = value;
        }
    }
    best
}
