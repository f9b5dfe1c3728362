// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective warp engine: maps an arbitrary quadrilateral of the source
// image onto an upright rectangle.

use image::DynamicImage;
use keystone_core::error::{KeystoneError, Result};
use keystone_core::{Point, Quad};
use tracing::{debug, info, instrument};

use crate::geometry::canonicalize;
use crate::primitives::{ImageprocBackend, ProjectiveSolver};

/// Upper bound on the pixel count of a warped image (about 1 GiB as RGBA).
pub const MAX_OUTPUT_PIXELS: u64 = 1 << 28;

/// No output side may exceed this multiple of the source's width plus height.
const MAX_SIDE_FACTOR: u64 = 2;

/// Output size for a canonical quadrilateral: the longer of each pair of
/// opposite edges, truncated to whole pixels.
pub fn output_size(quad: &Quad) -> (u32, u32) {
    let width = quad
        .bottom_right()
        .distance(&quad.bottom_left())
        .max(quad.top_right().distance(&quad.top_left()));
    let height = quad
        .top_right()
        .distance(&quad.bottom_right())
        .max(quad.top_left().distance(&quad.bottom_left()));
    (truncate(width), truncate(height))
}

fn truncate(len: f32) -> u32 {
    if len.is_finite() && len > 0.0 { len as u32 } else { 0 }
}

/// Warp the quadrilateral bounded by `points` (any order) to a rectangle.
///
/// Fails with [`KeystoneError::DegenerateGeometry`] when the quadrilateral
/// has no usable extent (a zero output dimension, less than one square
/// pixel of area, or no projective mapping) and when the output would be
/// larger than [`check_output_size`] allows.
pub fn warp_quadrilateral(image: &DynamicImage, points: [Point; 4]) -> Result<DynamicImage> {
    warp_quadrilateral_with(image, points, &ImageprocBackend)
}

/// [`warp_quadrilateral`] with an explicit projection backend.
#[instrument(skip_all, fields(src_w = image.width(), src_h = image.height()))]
pub fn warp_quadrilateral_with(
    image: &DynamicImage,
    points: [Point; 4],
    solver: &dyn ProjectiveSolver,
) -> Result<DynamicImage> {
    if !points.iter().all(Point::is_finite) {
        return Err(KeystoneError::DegenerateGeometry(
            "non-finite corner coordinate".into(),
        ));
    }

    let quad = canonicalize(points);
    let (width, height) = output_size(&quad);
    if width == 0 || height == 0 {
        return Err(KeystoneError::DegenerateGeometry(format!(
            "output would be {}x{} pixels",
            width, height
        )));
    }
    check_output_size(width, height, image.width(), image.height())?;
    let area = quad.area();
    if area < 1.0 {
        return Err(KeystoneError::DegenerateGeometry(format!(
            "quadrilateral area {:.3} px² is too small",
            area
        )));
    }

    let (w, h) = ((width - 1) as f32, (height - 1) as f32);
    let target = Quad::new([
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ]);
    debug!(corners = ?quad, width, height, "Solving projection");

    let warped = solver.warp(image, &quad, &target, width, height)?;
    info!(width, height, "Perspective warp complete");
    Ok(warped)
}

/// Reject an output buffer that is out of proportion to the source or larger
/// than [`MAX_OUTPUT_PIXELS`], before anything is allocated.
pub fn check_output_size(width: u32, height: u32, src_width: u32, src_height: u32) -> Result<()> {
    let max_side = MAX_SIDE_FACTOR * (src_width as u64 + src_height as u64);
    let pixels = width as u64 * height as u64;
    if width as u64 > max_side || height as u64 > max_side || pixels > MAX_OUTPUT_PIXELS {
        return Err(KeystoneError::DegenerateGeometry(format!(
            "output would be {}x{} pixels from a {}x{} source",
            width, height, src_width, src_height
        )));
    }
    Ok(())
}
