// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Computer-vision capability interfaces.
//
// The detection and warp engines never call a vision library directly; they
// go through these narrow traits so that another backend (or a test stub) can
// be substituted. `Primitives::default()` wires up the `image`/`imageproc`
// backend.

pub mod backend;
pub mod clahe;
pub mod polygon;
pub mod subpixel;

use image::{DynamicImage, GrayImage};
use keystone_core::config::{CandidateConfig, RefineConfig};
use keystone_core::error::Result;
use keystone_core::{Point, Quad};

pub use backend::ImageprocBackend;

/// Binary edge map extraction.
pub trait EdgeDetector: Send + Sync {
    /// Detect edges in a preprocessed grayscale image and close small gaps.
    /// Returns a map where edge pixels are non-zero.
    fn detect_edges(&self, gray: &GrayImage, config: &CandidateConfig) -> Result<GrayImage>;
}

/// Contour tracing and polygon simplification.
pub trait ContourExtractor: Send + Sync {
    /// Outermost contours of the non-zero regions of `edges`, in pixel
    /// coordinates. Holes and nested contours are excluded.
    fn external_contours(&self, edges: &GrayImage) -> Result<Vec<Vec<Point>>>;

    /// Simplify a closed curve so that no dropped point is further than
    /// `epsilon` from the result.
    fn approximate_polygon(&self, contour: &[Point], epsilon: f64) -> Vec<Point>;
}

/// Projective transform solve and resample.
pub trait ProjectiveSolver: Send + Sync {
    /// Map the `from` quadrilateral of `image` onto the `to` quadrilateral of
    /// a new `width` x `height` image.
    fn warp(
        &self,
        image: &DynamicImage,
        from: &Quad,
        to: &Quad,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage>;
}

/// Iterative subpixel corner search.
pub trait SubpixelSearch: Send + Sync {
    /// Refine `seed` (in `gray`'s coordinates) to the nearby corner position.
    fn refine(&self, gray: &GrayImage, seed: Point, config: &RefineConfig) -> Result<Point>;
}

/// One implementation of every capability the engine consumes.
pub struct Primitives {
    pub edges: Box<dyn EdgeDetector>,
    pub contours: Box<dyn ContourExtractor>,
    pub projection: Box<dyn ProjectiveSolver>,
    pub subpixel: Box<dyn SubpixelSearch>,
}

impl Default for Primitives {
    fn default() -> Self {
        Self {
            edges: Box::new(ImageprocBackend),
            contours: Box::new(ImageprocBackend),
            projection: Box::new(ImageprocBackend),
            subpixel: Box::new(ImageprocBackend),
        }
    }
}

impl std::fmt::Debug for Primitives {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Primitives").finish_non_exhaustive()
    }
}
