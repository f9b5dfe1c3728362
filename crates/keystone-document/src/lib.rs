// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// keystone-document — Perspective correction for photographed documents.
//
// Provides automatic corner detection (candidate search, scoring, subpixel
// refinement, fallback), corner canonicalization and bounds validation, and
// a perspective warp that turns the selected quadrilateral into an upright
// rectangle. Vision operations go through the capability traits in
// `primitives`; the default backend is `image` + `imageproc`.

pub mod correct;
pub mod detect;
pub mod geometry;
pub mod image;
pub mod primitives;
pub mod warp;

// Re-export the primary entry points so callers can use `keystone_document::detect_corners` etc.
pub use crate::image::ImageProcessor;
pub use correct::{crop_quadrilateral, crop_quadrilateral_with, preview_jpeg, preview_jpeg_with};
pub use detect::{CornerDetector, DetectionReport, Stage, confidence_score, detect_corners};
pub use geometry::{ValidatedCorners, canonicalize, validate_corners};
pub use primitives::{ImageprocBackend, Primitives, ProjectiveSolver};
pub use warp::{output_size, warp_quadrilateral, warp_quadrilateral_with};

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
    use keystone_core::config::RefineConfig;
    use keystone_core::{KeystoneError, Point, Quad};

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn finds_slide_corners_in_full_hd_frame() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(1920, 1080, |x, y| {
            if (192..1728).contains(&x) && (130..950).contains(&y) {
                Rgb([240, 240, 235])
            } else {
                Rgb([25, 28, 30])
            }
        }));
        let report = CornerDetector::default().detect_with_report(&img);
        let result = report.result;
        assert!(result.confidence > 0.5, "confidence {}", result.confidence);

        // Every corner is far from the frame edge, so all four are refined
        // and the bonus is applied to the best candidate's score.
        assert_eq!(report.refined, Some([true; 4]));
        let base = report
            .candidates
            .iter()
            .map(|c| c.confidence())
            .fold(0.0f32, f32::max);
        assert!((result.confidence - (base + 0.1).min(1.0)).abs() < 1e-6);

        let expected = [(192.0, 130.0), (1728.0, 130.0), (1728.0, 950.0), (192.0, 950.0)];
        for (got, (ex, ey)) in result.corners.points().iter().zip(expected) {
            assert!(
                (got.x - ex).abs() <= 5.0 && (got.y - ey).abs() <= 5.0,
                "corner {:?} too far from ({}, {})",
                got,
                ex,
                ey
            );
        }
    }

    #[test]
    fn blank_frame_gets_fallback_corners() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(800, 600, Luma([200u8])));
        let result = detect_corners(&img);
        assert_eq!(result.confidence, 0.1);
        assert_eq!(
            result.corners,
            Quad::new([p(64.0, 72.0), p(736.0, 72.0), p(736.0, 528.0), p(64.0, 528.0)])
        );
    }

    #[test]
    fn three_identical_points_cannot_be_warped() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(100, 100));
        let quad = [p(10.0, 10.0), p(10.0, 10.0), p(10.0, 10.0), p(60.0, 80.0)];
        let err = warp_quadrilateral(&img, quad).unwrap_err();
        assert!(matches!(err, KeystoneError::DegenerateGeometry(_)));
    }

    #[test]
    fn corner_at_frame_edge_is_not_refined() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(1000, 1000, Luma([90u8])));
        let quad = Quad::new([p(2.0, 2.0), p(800.0, 100.0), p(800.0, 800.0), p(100.0, 800.0)]);
        let cfg = RefineConfig::default();
        let out = detect::refine::refine_corners(&img, &quad, &cfg, &ImageprocBackend);
        assert!(!out.refined[0]);
        assert!(!out.all_refined());
        assert_eq!(out.corners.top_left(), p(2.0, 2.0));
    }

    #[test]
    fn axis_aligned_rectangle_round_trips_its_size() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(400, 300));
        let quad = [p(50.0, 40.0), p(173.0, 40.0), p(173.0, 117.0), p(50.0, 117.0)];
        let out = warp_quadrilateral(&img, quad).unwrap();
        assert_eq!((out.width(), out.height()), (123, 77));
    }
}
