// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Iterative subpixel corner search.
//
// At the true corner `q`, the image gradient at every neighbouring point `p`
// is orthogonal to `q - p` (the point lies either in a flat region or on an
// edge through `q`). Summing `g gᵀ (q - p) = 0` over a Gaussian-weighted
// neighbourhood gives a 2x2 linear system for `q`; it is re-solved around
// each new estimate until the update is smaller than the configured epsilon.

use image::GrayImage;
use keystone_core::Point;
use keystone_core::config::RefineConfig;
use keystone_core::error::{KeystoneError, Result};

/// Refine `seed` to subpixel accuracy inside `gray`.
///
/// Fails when the neighbourhood carries no corner structure (flat or a single
/// straight edge) or when the estimate drifts out of the search area; callers
/// keep the seed in that case.
pub fn corner_subpix(gray: &GrayImage, seed: Point, config: &RefineConfig) -> Result<Point> {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return Err(KeystoneError::DetectionFailure(format!(
            "subpixel window {width}x{height} too small"
        )));
    }
    if !seed.is_finite() {
        return Err(KeystoneError::DetectionFailure("non-finite corner seed".into()));
    }

    let half = config.search_half_window.max(1) as i32;
    let weights = gaussian_mask(half);
    let (mut cx, mut cy) = (seed.x as f64, seed.y as f64);

    for _ in 0..config.max_iterations.max(1) {
        let (mut a, mut b, mut c) = (0.0f64, 0.0f64, 0.0f64);
        let (mut bx, mut by) = (0.0f64, 0.0f64);

        for dy in -half..=half {
            for dx in -half..=half {
                let px = cx + dx as f64;
                let py = cy + dy as f64;
                let gx = (sample(gray, px + 1.0, py) - sample(gray, px - 1.0, py)) * 0.5;
                let gy = (sample(gray, px, py + 1.0) - sample(gray, px, py - 1.0)) * 0.5;
                let w = weights[((dy + half) * (2 * half + 1) + (dx + half)) as usize];

                let gxx = gx * gx * w;
                let gxy = gx * gy * w;
                let gyy = gy * gy * w;
                a += gxx;
                b += gxy;
                c += gyy;
                bx += gxx * px + gxy * py;
                by += gxy * px + gyy * py;
            }
        }

        let trace = a + c;
        let det = a * c - b * b;
        if trace <= f64::EPSILON || det <= 1e-9 * trace * trace {
            return Err(KeystoneError::DetectionFailure(
                "no corner structure around seed".into(),
            ));
        }

        let nx = (c * bx - b * by) / det;
        let ny = (a * by - b * bx) / det;
        let shift = (nx - cx).hypot(ny - cy);
        cx = nx;
        cy = ny;
        if shift <= config.epsilon as f64 {
            break;
        }
    }

    let limit = half as f64;
    if !cx.is_finite()
        || !cy.is_finite()
        || (cx - seed.x as f64).abs() > limit
        || (cy - seed.y as f64).abs() > limit
    {
        return Err(KeystoneError::DetectionFailure(format!(
            "subpixel search diverged from ({:.1}, {:.1})",
            seed.x, seed.y
        )));
    }

    Ok(Point::new(cx as f32, cy as f32))
}

/// Separable Gaussian weights over a `(2h+1)^2` window, row-major.
fn gaussian_mask(half: i32) -> Vec<f64> {
    let side = 2 * half + 1;
    let scale = 1.0 / half as f64;
    let mut mask = Vec::with_capacity((side * side) as usize);
    for dy in -half..=half {
        for dx in -half..=half {
            let (u, v) = (dx as f64 * scale, dy as f64 * scale);
            mask.push((-(u * u) - v * v).exp());
        }
    }
    mask
}

/// Bilinear sample with edge replication.
fn sample(gray: &GrayImage, x: f64, y: f64) -> f64 {
    let max_x = (gray.width() - 1) as f64;
    let max_y = (gray.height() - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);

    let at = |xx: f64, yy: f64| gray.get_pixel(xx as u32, yy as u32).0[0] as f64;
    let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
    let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
    top * (1.0 - fy) + bottom * fy
}
