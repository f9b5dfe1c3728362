// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Keystone.

use thiserror::Error;

/// Top-level error type for all Keystone operations.
#[derive(Debug, Error)]
pub enum KeystoneError {
    // -- Geometry errors --
    /// Zero-area or zero-length-edge quadrilateral handed to the warp engine.
    #[error("degenerate corner geometry: {0}")]
    DegenerateGeometry(String),

    #[error("expected exactly 4 corner points, got {0}")]
    InvalidCornerCount(usize),

    // -- Detection errors --
    /// Raised inside the detection pipeline and always absorbed by the
    /// orchestrator; never returned from `detect_corners`.
    #[error("corner detection failed: {0}")]
    DetectionFailure(String),

    // -- Image errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KeystoneError {
    /// True for errors caused by the caller's corner selection rather than
    /// by the image or the environment.
    pub fn is_invalid_selection(&self) -> bool {
        matches!(
            self,
            Self::DegenerateGeometry(_) | Self::InvalidCornerCount(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KeystoneError>;
