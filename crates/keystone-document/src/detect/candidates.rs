// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Candidate detector. Proposes document quadrilaterals from contours of a
// downscaled, contrast-enhanced edge map.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use imageproc::filter::gaussian_blur_f32;
use keystone_core::config::CandidateConfig;
use keystone_core::error::{KeystoneError, Result};
use keystone_core::{Point, Quad};
use tracing::{debug, instrument};

use crate::geometry::canonicalize;
use crate::primitives::{Primitives, clahe, polygon};

/// Size of the working image: the longer side is capped at `max_side`,
/// aspect ratio preserved with integer truncation, never below 1 px.
pub fn working_size(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let max_side = max_side.max(1);
    if width.max(height) <= max_side {
        return (width, height);
    }
    if width > height {
        let h = (height as u64 * max_side as u64 / width as u64) as u32;
        (max_side, h.max(1))
    } else {
        let w = (width as u64 * max_side as u64 / height as u64) as u32;
        (w.max(1), max_side)
    }
}

/// Grayscale, downscale, contrast-enhance and smooth `image` for edge search.
///
/// Returns the working image together with the `(sx, sy)` factors mapping
/// working coordinates back to source pixels.
pub fn prepare(image: &DynamicImage, config: &CandidateConfig) -> (GrayImage, (f32, f32)) {
    let (width, height) = (image.width(), image.height());
    let (sw, sh) = working_size(width, height, config.max_detection_side);

    let gray = image.to_luma8();
    let small = if (sw, sh) == (width, height) {
        gray
    } else {
        imageops::resize(&gray, sw, sh, FilterType::Triangle)
    };
    let scale = (width as f32 / sw as f32, height as f32 / sh as f32);

    let enhanced =
        clahe::equalize_adaptive(&small, config.clahe_clip_limit, config.clahe_tile_grid);
    let smoothed = if config.blur_sigma > 0.0 {
        gaussian_blur_f32(&enhanced, config.blur_sigma)
    } else {
        enhanced
    };
    (smoothed, scale)
}

/// Raw quadrilateral candidates in source coordinates, canonicalized,
/// largest contour first.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn detect_candidates(
    image: &DynamicImage,
    config: &CandidateConfig,
    primitives: &Primitives,
) -> Result<Vec<Quad>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(KeystoneError::DetectionFailure("image has no pixels".into()));
    }

    let (working, (sx, sy)) = prepare(image, config);
    let (sw, sh) = working.dimensions();
    debug!(sw, sh, sx, sy, "Working image prepared");

    let edges = primitives.edges.detect_edges(&working, config)?;

    let mut contours: Vec<(f64, Vec<Point>)> = primitives
        .contours
        .external_contours(&edges)?
        .into_iter()
        .map(|c| (polygon::area(&c), c))
        .collect();
    contours.sort_by(|a, b| b.0.total_cmp(&a.0));
    contours.truncate(config.max_contours);

    let working_area = sw as f64 * sh as f64;
    let mut candidates = Vec::new();

    for (rank, (_, contour)) in contours.iter().enumerate() {
        let perimeter = polygon::perimeter(contour);
        if perimeter <= 0.0 {
            continue;
        }
        let approx = primitives
            .contours
            .approximate_polygon(contour, config.polygon_epsilon_ratio * perimeter);
        let [a, b, c, d] = approx[..] else {
            debug!(rank, vertices = approx.len(), "Contour is not a quadrilateral");
            continue;
        };

        let area_ratio = polygon::area(&approx) / working_area;
        if area_ratio <= config.min_area_ratio || area_ratio >= config.max_area_ratio {
            debug!(rank, area_ratio, "Quadrilateral outside the area band");
            continue;
        }

        let quad = canonicalize([a, b, c, d].map(|p| p.upscaled(sx, sy)));
        debug!(rank, area_ratio, corners = ?quad, "Quadrilateral candidate");
        candidates.push(quad);
    }

    debug!(count = candidates.len(), "Candidate detection complete");
    Ok(candidates)
}
