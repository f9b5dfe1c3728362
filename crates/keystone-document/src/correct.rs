// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Correction flows for caller-supplied corners: full-resolution crop and a
// size-capped JPEG preview.

use image::DynamicImage;
use keystone_core::config::PreviewConfig;
use keystone_core::error::Result;
use keystone_core::{Point, Quad};
use tracing::{info, instrument};

use crate::geometry::validate_corners;
use crate::image::ImageProcessor;
use crate::primitives::{ImageprocBackend, ProjectiveSolver};
use crate::warp::warp_quadrilateral_with;

/// Clamp `points` into the image and warp the enclosed region.
///
/// Rejects anything other than exactly four points with
/// `InvalidCornerCount`; a quadrilateral that collapses after clamping fails
/// with `DegenerateGeometry`.
pub fn crop_quadrilateral(image: &DynamicImage, points: &[Point]) -> Result<DynamicImage> {
    crop_quadrilateral_with(image, points, &ImageprocBackend)
}

/// [`crop_quadrilateral`] with an explicit projection backend.
#[instrument(skip_all, fields(points = points.len()))]
pub fn crop_quadrilateral_with(
    image: &DynamicImage,
    points: &[Point],
    solver: &dyn ProjectiveSolver,
) -> Result<DynamicImage> {
    let quad = Quad::from_slice(points)?;
    let validated = validate_corners(*quad.points(), image.width(), image.height());
    if !validated.adjustments.is_empty() {
        info!(moved = validated.adjustments.len(), "Corners clamped before warp");
    }
    warp_quadrilateral_with(image, validated.points, solver)
}

/// Correct the selection and encode a downscaled JPEG preview.
pub fn preview_jpeg(
    image: &DynamicImage,
    points: &[Point],
    config: &PreviewConfig,
) -> Result<Vec<u8>> {
    preview_jpeg_with(image, points, config, &ImageprocBackend)
}

/// [`preview_jpeg`] with an explicit projection backend.
#[instrument(skip_all, fields(points = points.len(), max_side = config.max_side))]
pub fn preview_jpeg_with(
    image: &DynamicImage,
    points: &[Point],
    config: &PreviewConfig,
    solver: &dyn ProjectiveSolver,
) -> Result<Vec<u8>> {
    let warped = crop_quadrilateral_with(image, points, solver)?;
    ImageProcessor::from_dynamic(warped)
        .shrink_to_fit(config.max_side)
        .to_jpeg_bytes(config.jpeg_quality)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use keystone_core::KeystoneError;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    fn photo(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        }))
    }

    /// Counts calls and returns a flat grey image of the requested size.
    #[derive(Default)]
    pub(crate) struct FlatSolver {
        pub(crate) calls: AtomicUsize,
    }

    impl ProjectiveSolver for FlatSolver {
        fn warp(
            &self,
            _: &DynamicImage,
            _: &Quad,
            _: &Quad,
            width: u32,
            height: u32,
        ) -> Result<DynamicImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([77u8]))))
        }
    }

    #[test]
    fn three_points_are_rejected() {
        let points = [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)];
        let err = crop_quadrilateral(&photo(50, 50), &points).unwrap_err();
        assert!(matches!(err, KeystoneError::InvalidCornerCount(3)));
    }

    #[test]
    fn out_of_bounds_corners_are_clamped_first() {
        let img = photo(100, 80);
        let points = [p(-20.0, -20.0), p(140.0, -5.0), p(140.0, 100.0), p(-1.0, 100.0)];
        let out = crop_quadrilateral(&img, &points).unwrap();
        // Clamped to the full frame: 100 x 80.
        assert_eq!((out.width(), out.height()), (100, 80));
    }

    #[test]
    fn preview_is_capped_and_decodable() {
        let img = photo(2400, 1600);
        let cfg = PreviewConfig::default();
        let points = [p(0.0, 0.0), p(2000.0, 0.0), p(2000.0, 1000.0), p(0.0, 1000.0)];
        let bytes = preview_jpeg(&img, &points, &cfg).unwrap();
        let decoded = ImageProcessor::from_bytes(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 400));
    }

    #[test]
    fn small_preview_is_not_enlarged() {
        let img = photo(300, 200);
        let bytes = preview_jpeg(
            &img,
            &[p(10.0, 10.0), p(210.0, 10.0), p(210.0, 110.0), p(10.0, 110.0)],
            &PreviewConfig::default(),
        )
        .unwrap();
        let decoded = ImageProcessor::from_bytes(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
    }

    #[test]
    fn crop_and_preview_use_the_given_solver() {
        let img = photo(300, 200);
        let solver = FlatSolver::default();
        let points = [p(10.0, 10.0), p(210.0, 10.0), p(210.0, 110.0), p(10.0, 110.0)];

        let out = crop_quadrilateral_with(&img, &points, &solver).unwrap();
        assert_eq!((out.width(), out.height()), (200, 100));
        assert_eq!(out.as_luma8().map(|g| g.get_pixel(5, 5).0[0]), Some(77));

        let bytes = preview_jpeg_with(&img, &points, &PreviewConfig::default(), &solver).unwrap();
        let decoded = ImageProcessor::from_bytes(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
        assert_eq!(solver.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn solver_is_not_called_for_a_bad_selection() {
        let solver = FlatSolver::default();
        let collapsed = [p(5.0, 5.0); 4];
        assert!(crop_quadrilateral_with(&photo(50, 50), &collapsed, &solver).is_err());
        assert_eq!(solver.calls.load(Ordering::SeqCst), 0);
    }
}
