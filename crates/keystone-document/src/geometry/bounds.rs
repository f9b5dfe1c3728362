// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner validation against image bounds.

use keystone_core::{CornerAdjustment, Point};
use tracing::debug;

/// Corners clamped into the image, with a record of what moved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCorners {
    /// The input points, in input order, each inside `[0, W] x [0, H]`.
    pub points: [Point; 4],
    /// One entry per corner that had to be moved.
    pub adjustments: Vec<CornerAdjustment>,
}

/// Clamp every point into `[0, width] x [0, height]`.
///
/// Never rejects input: an out-of-bounds corner is not an error, it is moved
/// to the nearest in-bounds position and reported in `adjustments`. Points
/// already inside the image are returned bit-for-bit unchanged. A non-finite
/// coordinate is clamped to the lower bound.
pub fn validate_corners(points: [Point; 4], width: u32, height: u32) -> ValidatedCorners {
    let (w, h) = (width as f32, height as f32);
    let mut adjustments = Vec::new();

    let clamped: [Point; 4] = std::array::from_fn(|index| {
        let from = points[index];
        let to = Point::new(clamp_axis(from.x, w), clamp_axis(from.y, h));
        if to != from {
            debug!(
                corner = index + 1,
                from_x = from.x,
                from_y = from.y,
                to_x = to.x,
                to_y = to.y,
                "Corner clamped into image bounds"
            );
            adjustments.push(CornerAdjustment { index, from, to });
        }
        to
    });

    ValidatedCorners {
        points: clamped,
        adjustments,
    }
}

fn clamp_axis(value: f32, upper: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, upper)
    }
}
