// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration. Every tunable of the detection pipeline lives here so
// that tests can run the pipeline with alternate thresholds.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// Settings for the candidate detector (downscale, preprocess, edges, contours).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Longer side of the working image used for contour search.
    pub max_detection_side: u32,
    /// CLAHE clip limit, relative to a uniform histogram.
    pub clahe_clip_limit: f32,
    /// CLAHE tiles per axis.
    pub clahe_tile_grid: u32,
    /// Gaussian smoothing sigma (1.1 matches a 5x5 kernel).
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Radius of the square closing kernel (1 = 3x3).
    pub closing_radius: u8,
    /// Largest contours examined, by enclosed area.
    pub max_contours: usize,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub polygon_epsilon_ratio: f64,
    /// Exclusive lower bound on quad area / working image area.
    pub min_area_ratio: f64,
    /// Exclusive upper bound on quad area / working image area.
    pub max_area_ratio: f64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            max_detection_side: 400,
            clahe_clip_limit: 2.0,
            clahe_tile_grid: 8,
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            closing_radius: 1,
            max_contours: 10,
            polygon_epsilon_ratio: 0.02,
            min_area_ratio: 0.05,
            max_area_ratio: 0.80,
        }
    }
}

/// Weights and bands of the confidence heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub diagonal_weight: f64,
    pub center_weight: f64,
    pub area_weight: f64,
    /// Area ratios strictly inside `(area_band_min, area_band_max)` score 1.
    pub area_band_min: f64,
    pub area_band_max: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            diagonal_weight: 0.4,
            center_weight: 0.3,
            area_weight: 0.3,
            area_band_min: 0.1,
            area_band_max: 0.9,
        }
    }
}

/// Subpixel corner refinement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Half-size of the window cut out around each corner.
    pub window_radius: u32,
    /// Windows not larger than this on both sides are skipped.
    pub min_window_side: u32,
    /// Half-size of the gradient search area (5 = 11x11).
    pub search_half_window: u32,
    pub max_iterations: u32,
    /// Convergence threshold on the per-iteration shift, in pixels.
    pub epsilon: f32,
    /// Added to the confidence when every corner was refined.
    pub confidence_bonus: f32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            window_radius: 15,
            min_window_side: 10,
            search_half_window: 5,
            max_iterations: 30,
            epsilon: 0.1,
            confidence_bonus: 0.1,
        }
    }
}

/// Fixed-margin default quadrilateral used when detection finds nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub margin_x_ratio: f64,
    pub margin_y_ratio: f64,
    pub confidence: f32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            margin_x_ratio: 0.08,
            margin_y_ratio: 0.12,
            confidence: 0.1,
        }
    }
}

/// Full detection pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub candidates: CandidateConfig,
    pub scoring: ScoringConfig,
    pub refine: RefineConfig,
    pub fallback: FallbackConfig,
    /// Best confidence strictly above this triggers subpixel refinement.
    pub refine_threshold: f32,
    /// Best confidence below this is discarded in favour of the fallback.
    pub accept_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            candidates: CandidateConfig::default(),
            scoring: ScoringConfig::default(),
            refine: RefineConfig::default(),
            fallback: FallbackConfig::default(),
            refine_threshold: 0.3,
            accept_threshold: 0.2,
        }
    }
}

/// Preview rendering of a warped result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Longer side of the preview; larger results are shrunk.
    pub max_side: u32,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_side: 800,
            jpeg_quality: 90,
        }
    }
}

/// Persistent engine settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoneConfig {
    pub detection: DetectionConfig,
    pub preview: PreviewConfig,
}

impl KeystoneConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&data)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?)?;
        debug!(path = %path.display(), "Configuration written");
        Ok(())
    }
}
