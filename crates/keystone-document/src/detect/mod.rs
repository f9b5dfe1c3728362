// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Automatic document corner detection.

pub mod candidates;
pub mod fallback;
pub mod pipeline;
pub mod refine;
pub mod score;

pub use pipeline::{
    CornerDetector, Decision, DetectionReport, ScoredCandidate, Stage, decide, detect_corners,
};
pub use score::{ScoreBreakdown, confidence_score};
