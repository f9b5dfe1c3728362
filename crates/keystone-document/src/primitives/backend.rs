// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `image` / `imageproc` implementation of the capability traits.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::geometry::approximate_polygon_dp;
use imageproc::morphology::close;
use keystone_core::config::{CandidateConfig, RefineConfig};
use keystone_core::error::{KeystoneError, Result};
use keystone_core::{Point, Quad};
use tracing::debug;

use super::{ContourExtractor, EdgeDetector, ProjectiveSolver, SubpixelSearch, polygon, subpixel};

/// Default backend. Stateless; every call works on its own buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocBackend;

impl EdgeDetector for ImageprocBackend {
    fn detect_edges(&self, gray: &GrayImage, config: &CandidateConfig) -> Result<GrayImage> {
        if config.canny_low > config.canny_high {
            return Err(KeystoneError::DetectionFailure(format!(
                "canny thresholds out of order: low {} > high {}",
                config.canny_low, config.canny_high
            )));
        }
        let edges = canny(gray, config.canny_low, config.canny_high);
        if config.closing_radius == 0 {
            return Ok(edges);
        }
        // Square structuring element bridges one-pixel breaks in the edges.
        Ok(close(&edges, Norm::LInf, config.closing_radius))
    }
}

impl ContourExtractor for ImageprocBackend {
    fn external_contours(&self, edges: &GrayImage) -> Result<Vec<Vec<Point>>> {
        let contours = find_contours::<i32>(edges);
        let external: Vec<Vec<Point>> = contours
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                c.points
                    .into_iter()
                    .map(|p| Point::new(p.x as f32, p.y as f32))
                    .collect()
            })
            .collect();
        debug!(count = external.len(), "External contours extracted");
        Ok(external)
    }

    fn approximate_polygon(&self, contour: &[Point], epsilon: f64) -> Vec<Point> {
        // approximate_polygon_dp panics on an empty curve or a non-positive epsilon.
        if contour.len() < 3 || epsilon.is_nan() || epsilon <= 0.0 {
            return contour.to_vec();
        }
        let curve = polygon::to_pixel_points(contour);
        polygon::from_pixel_points(&approximate_polygon_dp(&curve, epsilon, true))
    }
}

impl ProjectiveSolver for ImageprocBackend {
    fn warp(
        &self,
        image: &DynamicImage,
        from: &Quad,
        to: &Quad,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage> {
        let projection = Projection::from_control_points(from.as_tuples(), to.as_tuples())
            .ok_or_else(|| {
                KeystoneError::DegenerateGeometry(
                    "no projective mapping exists for these corners".into(),
                )
            })?;

        // Resample in the source's own pixel format where it is a common
        // 8-bit one; anything else goes through RGBA.
        let warped = match image {
            DynamicImage::ImageLuma8(gray) => {
                let mut out = GrayImage::new(width, height);
                warp_into(gray, &projection, Interpolation::Bilinear, Luma([0u8]), &mut out);
                DynamicImage::ImageLuma8(out)
            }
            DynamicImage::ImageRgb8(rgb) => {
                let mut out = RgbImage::new(width, height);
                warp_into(rgb, &projection, Interpolation::Bilinear, Rgb([0u8, 0, 0]), &mut out);
                DynamicImage::ImageRgb8(out)
            }
            other => {
                let rgba = other.to_rgba8();
                let mut out = RgbaImage::new(width, height);
                warp_into(
                    &rgba,
                    &projection,
                    Interpolation::Bilinear,
                    Rgba([0u8, 0, 0, 255]),
                    &mut out,
                );
                DynamicImage::ImageRgba8(out)
            }
        };
        Ok(warped)
    }
}

impl SubpixelSearch for ImageprocBackend {
    fn refine(&self, gray: &GrayImage, seed: Point, config: &RefineConfig) -> Result<Point> {
        subpixel::corner_subpix(gray, seed, config)
    }
}
