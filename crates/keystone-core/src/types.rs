// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Keystone correction engine.

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::error::{KeystoneError, Result};

/// A 2-D coordinate in the pixel space of one specific image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Map a pixel position in an image shrunk by `(sx, sy)` back to the
    /// source, keeping pixel centres aligned.
    pub fn upscaled(&self, sx: f32, sy: f32) -> Self {
        Self::new((self.x + 0.5) * sx - 0.5, (self.y + 0.5) * sy - 0.5)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for (f32, f32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Four points in a fixed sequence.
///
/// When produced by the canonicalizer the order is
/// `[top_left, top_right, bottom_right, bottom_left]`. Raw detector output
/// carries no ordering guarantee until it has been canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub const fn new(points: [Point; 4]) -> Self {
        Self(points)
    }

    /// Build a quadrilateral from a caller-supplied list, rejecting anything
    /// that is not exactly four points.
    pub fn from_slice(points: &[Point]) -> Result<Self> {
        match points {
            [a, b, c, d] => Ok(Self([*a, *b, *c, *d])),
            other => Err(KeystoneError::InvalidCornerCount(other.len())),
        }
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn top_left(&self) -> Point {
        self.0[0]
    }

    pub fn top_right(&self) -> Point {
        self.0[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.0[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.0[3]
    }

    /// Enclosed area via the shoelace formula. Only meaningful when the
    /// vertices are in traversal order (CW or CCW).
    pub fn area(&self) -> f64 {
        let mut twice = 0.0f64;
        for i in 0..4 {
            let a = self.0[i];
            let b = self.0[(i + 1) % 4];
            twice += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
        }
        twice.abs() / 2.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(Point::is_finite)
    }

    /// Corners as `(x, y)` tuples, the form `imageproc` projections take.
    pub fn as_tuples(&self) -> [(f32, f32); 4] {
        self.0.map(Into::into)
    }
}

/// Outcome of automatic corner detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Canonical corners in source-pixel space. Always populated: when
    /// nothing usable was found this is the fallback quadrilateral.
    pub corners: Quad,
    /// Heuristic quality in `[0, 1]`. `0.0` means total failure, values below
    /// the accept threshold mean the fallback was used.
    pub confidence: f32,
}

impl DetectionResult {
    pub fn trust(&self, config: &DetectionConfig) -> Trust {
        Trust::classify(self.confidence, config)
    }

    /// User-facing summary of how far the corners can be relied upon.
    pub fn advice(&self, config: &DetectionConfig) -> String {
        match self.trust(config) {
            Trust::High => format!(
                "Corners detected with {:.0}% confidence.",
                self.confidence * 100.0
            ),
            Trust::Low => {
                "Detection confidence is low; please check and adjust the corners.".into()
            }
            Trust::Fallback => {
                "No document edges found; default corners were placed for manual adjustment."
                    .into()
            }
            Trust::Failed => {
                "Automatic detection failed; please place the corners manually.".into()
            }
        }
    }
}

/// How much a detection can be trusted, derived from its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trust {
    /// The pipeline failed outright; defaults with the lowest trust.
    Failed,
    /// No candidate cleared the accept threshold; fixed-margin defaults.
    Fallback,
    /// A genuine candidate that did not qualify for refinement.
    Low,
    /// A candidate above the refinement threshold.
    High,
}

impl Trust {
    pub fn classify(confidence: f32, config: &DetectionConfig) -> Self {
        if confidence <= 0.0 {
            Self::Failed
        } else if confidence < config.accept_threshold {
            Self::Fallback
        } else if confidence <= config.refine_threshold {
            Self::Low
        } else {
            Self::High
        }
    }
}

/// Diagnostic record of a corner moved back inside the image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerAdjustment {
    /// Position of the corner in the caller's sequence.
    pub index: usize,
    pub from: Point,
    pub to: Point,
}

impl CornerAdjustment {
    /// How far the corner moved, in pixels.
    pub fn displacement(&self) -> f32 {
        self.from.distance(&self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Quad {
        Quad::new([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    #[test]
    fn quad_area_of_rectangle() {
        let area = rect(0.0, 0.0, 10.0, 5.0).area();
        assert!((area - 50.0).abs() < 1e-9, "Expected 50.0, got {}", area);
    }

    #[test]
    fn quad_area_is_orientation_independent() {
        let q = rect(0.0, 0.0, 10.0, 5.0);
        let mut reversed = q.0;
        reversed.reverse();
        assert!((Quad(reversed).area() - q.area()).abs() < 1e-9);
    }

    #[test]
    fn from_slice_rejects_wrong_count() {
        let pts = [Point::new(0.0, 0.0); 3];
        match Quad::from_slice(&pts) {
            Err(KeystoneError::InvalidCornerCount(3)) => {}
            other => panic!("expected InvalidCornerCount(3), got {:?}", other),
        }
        assert!(Quad::from_slice(&[Point::default(); 4]).is_ok());
    }

    #[test]
    fn trust_bands_follow_thresholds() {
        let cfg = DetectionConfig::default();
        assert_eq!(Trust::classify(0.0, &cfg), Trust::Failed);
        assert_eq!(Trust::classify(0.1, &cfg), Trust::Fallback);
        assert_eq!(Trust::classify(0.25, &cfg), Trust::Low);
        assert_eq!(Trust::classify(0.3, &cfg), Trust::Low);
        assert_eq!(Trust::classify(0.75, &cfg), Trust::High);
    }

    #[test]
    fn quad_serializes_as_plain_point_list() {
        let json = serde_json::to_string(&rect(0.0, 0.0, 2.0, 1.0)).unwrap();
        assert!(json.starts_with("[{\"x\":0.0"), "got {}", json);
    }

    #[test]
    fn upscaling_aligns_pixel_centres() {
        assert_eq!(Point::new(3.0, 7.0).upscaled(1.0, 1.0), Point::new(3.0, 7.0));
        // Pixel 0 of a half-size image covers source pixels 0 and 1.
        assert_eq!(Point::new(0.0, 0.0).upscaled(2.0, 2.0), Point::new(0.5, 0.5));
        assert_eq!(Point::new(10.0, 4.0).upscaled(4.0, 2.0), Point::new(41.5, 8.5));
    }

    #[test]
    fn adjustment_displacement() {
        let adj = CornerAdjustment {
            index: 0,
            from: Point::new(-3.0, -4.0),
            to: Point::new(0.0, 0.0),
        };
        assert!((adj.displacement() - 5.0).abs() < 1e-6);
    }
}
