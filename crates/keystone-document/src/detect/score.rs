// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Confidence scoring for candidate quadrilaterals.

use keystone_core::config::ScoringConfig;
use keystone_core::{Point, Quad};
use serde::Serialize;

/// The three geometric sub-scores behind a confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Shorter diagonal over longer diagonal.
    pub diagonal_ratio: f64,
    /// `1 - mean corner distance to image centre / half image diagonal`.
    pub centering: f64,
    /// 1 inside the preferred area band, decaying with distance from 50% outside it.
    pub area: f64,
    /// Weighted sum, clamped to `[0, 1]`.
    pub confidence: f32,
}

impl ScoreBreakdown {
    fn zero() -> Self {
        Self {
            diagonal_ratio: 0.0,
            centering: 0.0,
            area: 0.0,
            confidence: 0.0,
        }
    }
}

/// Score `quad` against an image of `width` x `height` pixels.
///
/// Never fails: degenerate or non-finite input scores 0.
pub fn score_breakdown(
    quad: &Quad,
    width: u32,
    height: u32,
    config: &ScoringConfig,
) -> ScoreBreakdown {
    if width == 0 || height == 0 || !quad.is_finite() {
        return ScoreBreakdown::zero();
    }
    let (w, h) = (width as f64, height as f64);

    let d1 = dist(quad.top_left(), quad.bottom_right());
    let d2 = dist(quad.top_right(), quad.bottom_left());
    let longest = d1.max(d2);
    let diagonal_ratio = if longest > 0.0 { d1.min(d2) / longest } else { 0.0 };

    let (cx, cy) = (w / 2.0, h / 2.0);
    let mean_offset = quad
        .points()
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / 4.0;
    let centering = 1.0 - mean_offset / (w.hypot(h) / 2.0);

    let ratio = quad.area() / (w * h);
    let area = if ratio > config.area_band_min && ratio < config.area_band_max {
        1.0
    } else {
        (1.0 - (ratio - 0.5).abs() * 2.0).max(0.0)
    };

    let raw = diagonal_ratio * config.diagonal_weight
        + centering * config.center_weight
        + area * config.area_weight;
    let confidence = if raw.is_finite() { raw.clamp(0.0, 1.0) as f32 } else { 0.0 };

    ScoreBreakdown {
        diagonal_ratio,
        centering,
        area,
        confidence,
    }
}

/// Confidence in `[0, 1]` that `quad` outlines the document.
pub fn confidence_score(quad: &Quad, width: u32, height: u32, config: &ScoringConfig) -> f32 {
    score_breakdown(quad, width, height, config).confidence
}

fn dist(a: Point, b: Point) -> f64 {
    (a.x as f64 - b.x as f64).hypot(a.y as f64 - b.y as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(pts: [(f32, f32); 4]) -> Quad {
        Quad::new(pts.map(Point::from))
    }

    #[test]
    fn centred_rectangle_scores_high() {
        // 60% of a 1000x1000 frame, perfectly centred.
        let q = quad([(112.7, 112.7), (887.3, 112.7), (887.3, 887.3), (112.7, 887.3)]);
        let b = score_breakdown(&q, 1000, 1000, &ScoringConfig::default());
        assert!((b.diagonal_ratio - 1.0).abs() < 1e-9);
        assert_eq!(b.area, 1.0);
        // Corners sit at 0.775 of the half-diagonal from the centre.
        assert!((b.centering - 0.225).abs() < 0.01, "centering {}", b.centering);
        assert!((b.confidence - 0.7675).abs() < 0.01, "confidence {}", b.confidence);
    }

    #[test]
    fn skewed_small_quad_scores_lower() {
        let cfg = ScoringConfig::default();
        let good = quad([(100.0, 100.0), (900.0, 100.0), (900.0, 700.0), (100.0, 700.0)]);
        let skewed = quad([(0.0, 0.0), (60.0, 10.0), (300.0, 300.0), (10.0, 40.0)]);
        let skewed_score = confidence_score(&skewed, 1000, 800, &cfg);
        assert!(skewed_score < confidence_score(&good, 1000, 800, &cfg));
    }

    #[test]
    fn area_outside_band_decays_towards_zero() {
        let cfg = ScoringConfig::default();
        // Covers the whole frame: ratio 1.0 -> area score 0.
        let full = quad([(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        assert_eq!(score_breakdown(&full, 100, 100, &cfg).area, 0.0);
        // 5% of the frame: 1 - 0.45 * 2 = 0.1.
        let small = quad([(0.0, 0.0), (10.0, 0.0), (10.0, 50.0), (0.0, 50.0)]);
        assert!((score_breakdown(&small, 100, 100, &cfg).area - 0.1).abs() < 1e-9);
    }

    #[test]
    fn degenerate_input_scores_zero() {
        let cfg = ScoringConfig::default();
        let point = quad([(5.0, 5.0); 4]);
        let c = confidence_score(&point, 100, 100, &cfg);
        assert!((0.0..=1.0).contains(&c));

        let nan = quad([(f32::NAN, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert_eq!(confidence_score(&nan, 100, 100, &cfg), 0.0);
        assert_eq!(confidence_score(&point, 0, 100, &cfg), 0.0);
    }

    #[test]
    fn far_off_image_corners_clamp_to_zero() {
        let q = quad([(-1e6, -1e6), (1e6, -1e6), (1e6, -9e5), (-1e6, -9e5)]);
        let c = confidence_score(&q, 100, 100, &ScoringConfig::default());
        assert!((0.0..=1.0).contains(&c));
    }
}
