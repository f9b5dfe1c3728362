// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subpixel refinement of accepted corners on the full-resolution image.

use image::{DynamicImage, GrayImage, imageops};
use keystone_core::config::RefineConfig;
use keystone_core::{Point, Quad};
use serde::Serialize;
use tracing::debug;

use crate::primitives::SubpixelSearch;

/// Corners after refinement, with a per-corner success flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefinedCorners {
    pub corners: Quad,
    pub refined: [bool; 4],
}

impl RefinedCorners {
    /// True when every corner was moved by the subpixel search. Only then
    /// does the detection earn the confidence bonus.
    pub fn all_refined(&self) -> bool {
        self.refined.iter().all(|r| *r)
    }
}

/// Refine each corner of `quad` inside a square window around it.
///
/// Corners closer than `window_radius` to an image edge, or whose window
/// would be too small, are kept as they are. A failed search keeps the
/// corner too; refinement never fails as a whole.
pub fn refine_corners(
    image: &DynamicImage,
    quad: &Quad,
    config: &RefineConfig,
    search: &dyn SubpixelSearch,
) -> RefinedCorners {
    let gray = image.to_luma8();
    refine_gray(&gray, quad, config, search)
}

fn refine_gray(
    gray: &GrayImage,
    quad: &Quad,
    config: &RefineConfig,
    search: &dyn SubpixelSearch,
) -> RefinedCorners {
    let (width, height) = (gray.width() as i64, gray.height() as i64);
    let radius = config.window_radius as i64;
    let min_side = config.min_window_side as i64;

    let mut corners = *quad.points();
    let mut refined = [false; 4];

    for (index, corner) in quad.points().iter().enumerate() {
        if !corner.is_finite() {
            continue;
        }
        let (x, y) = (corner.x as i64, corner.y as i64);
        if x < radius || y < radius || x + radius > width || y + radius > height {
            debug!(corner = index + 1, x, y, "Corner too close to the image edge; not refined");
            continue;
        }

        let (x1, x2) = ((x - radius).max(0), (x + radius).min(width));
        let (y1, y2) = ((y - radius).max(0), (y + radius).min(height));
        if x2 - x1 <= min_side || y2 - y1 <= min_side {
            debug!(corner = index + 1, "Refinement window too small");
            continue;
        }

        let (w, h) = ((x2 - x1) as u32, (y2 - y1) as u32);
        let window = imageops::crop_imm(gray, x1 as u32, y1 as u32, w, h).to_image();
        let seed = Point::new(corner.x - x1 as f32, corner.y - y1 as f32);

        match search.refine(&window, seed, config) {
            Ok(p) => {
                corners[index] = Point::new(p.x + x1 as f32, p.y + y1 as f32);
                refined[index] = true;
                debug!(
                    corner = index + 1,
                    from_x = corner.x,
                    from_y = corner.y,
                    to_x = corners[index].x,
                    to_y = corners[index].y,
                    "Corner refined"
                );
            }
            Err(e) => {
                debug!(corner = index + 1, error = %e, "Subpixel search failed; corner kept");
            }
        }
    }

    RefinedCorners {
        corners: Quad::new(corners),
        refined,
    }
}
