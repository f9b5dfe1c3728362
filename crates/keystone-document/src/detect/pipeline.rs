// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection orchestrator.
//
// Drives one image through
//
//   Detecting -> Scoring -> (Refining | FallingBack) -> Validating -> Done
//
// Every stage before Validating runs behind a failure boundary: an error or
// a panic inside it sends the pipeline to FallingBack with confidence 0.0.
// The caller always gets a result.

use std::panic::{self, AssertUnwindSafe};

use image::DynamicImage;
use keystone_core::config::DetectionConfig;
use keystone_core::error::{KeystoneError, Result};
use keystone_core::{CornerAdjustment, DetectionResult, Quad};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::candidates::detect_candidates;
use super::fallback::fallback_corners;
use super::refine::{RefinedCorners, refine_corners};
use super::score::{ScoreBreakdown, score_breakdown};
use crate::geometry::validate_corners;
use crate::primitives::Primitives;

/// Pipeline stages, in the order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Detecting,
    Scoring,
    Refining,
    FallingBack,
    Validating,
    Done,
}

/// What to do with the best-scoring candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Above the refinement threshold: refine, then validate.
    Refine,
    /// Between the accept and refinement thresholds: validate as is.
    Accept,
    /// Nothing usable: use the fallback corners.
    FallBack,
}

/// Map the best candidate confidence (if any) to the next stage.
pub fn decide(best: Option<f32>, config: &DetectionConfig) -> Decision {
    match best {
        Some(c) if !c.is_finite() || c < config.accept_threshold => Decision::FallBack,
        Some(c) if c > config.refine_threshold => Decision::Refine,
        Some(_) => Decision::Accept,
        None => Decision::FallBack,
    }
}

/// A candidate together with its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub corners: Quad,
    pub score: ScoreBreakdown,
}

impl ScoredCandidate {
    pub fn confidence(&self) -> f32 {
        self.score.confidence
    }
}

/// Everything the pipeline did for one image, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
    pub result: DetectionResult,
    /// Stages visited, in order, ending with `Done`.
    pub stages: Vec<Stage>,
    /// Every candidate that reached scoring, in detection order.
    pub candidates: Vec<ScoredCandidate>,
    /// Per-corner refinement outcome, when refinement ran.
    pub refined: Option<[bool; 4]>,
    /// Corners moved by the bounds validator.
    pub adjustments: Vec<CornerAdjustment>,
    /// The error or panic message that forced a total-failure fallback.
    pub failure: Option<String>,
}

enum State {
    Detecting,
    Scoring(Vec<Quad>),
    Refining(ScoredCandidate),
    FallingBack { confidence: f32 },
    Validating { corners: Quad, confidence: f32 },
    Done(DetectionResult),
}

impl State {
    fn stage(&self) -> Stage {
        match self {
            State::Detecting => Stage::Detecting,
            State::Scoring(_) => Stage::Scoring,
            State::Refining(_) => Stage::Refining,
            State::FallingBack { .. } => Stage::FallingBack,
            State::Validating { .. } => Stage::Validating,
            State::Done(_) => Stage::Done,
        }
    }
}

/// Automatic document corner detector.
///
/// Holds only configuration and stateless capability implementations, so
/// one detector can serve any number of threads.
#[derive(Debug, Default)]
pub struct CornerDetector {
    config: DetectionConfig,
    primitives: Primitives,
}

impl CornerDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            primitives: Primitives::default(),
        }
    }

    pub fn with_primitives(config: DetectionConfig, primitives: Primitives) -> Self {
        Self { config, primitives }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Capabilities this detector runs on; the projection solver is the one
    /// corrections of its results should use.
    pub fn primitives(&self) -> &Primitives {
        &self.primitives
    }

    /// Detect the document corners in `image`. Never fails.
    pub fn detect(&self, image: &DynamicImage) -> DetectionResult {
        self.detect_with_report(image).result
    }

    /// Like [`detect`](Self::detect), also returning the stage trace and
    /// every scored candidate.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect_with_report(&self, image: &DynamicImage) -> DetectionReport {
        let (width, height) = (image.width(), image.height());
        let cfg = &self.config;

        let mut stages = Vec::new();
        let mut scored: Vec<ScoredCandidate> = Vec::new();
        let mut refined: Option<[bool; 4]> = None;
        let mut adjustments = Vec::new();
        let mut failure: Option<String> = None;

        let mut state = State::Detecting;
        let result = loop {
            stages.push(state.stage());
            state = match state {
                State::Detecting => {
                    match guarded(|| detect_candidates(image, &cfg.candidates, &self.primitives)) {
                        Ok(found) if found.is_empty() => {
                            warn!("No quadrilateral candidates; using fallback corners");
                            State::FallingBack {
                                confidence: cfg.fallback.confidence,
                            }
                        }
                        Ok(found) => State::Scoring(found),
                        Err(e) => {
                            warn!(error = %e, "Candidate detection failed");
                            failure = Some(e.to_string());
                            State::FallingBack { confidence: 0.0 }
                        }
                    }
                }

                State::Scoring(found) => {
                    let scoring = guarded(|| {
                        Ok(found
                            .iter()
                            .map(|q| ScoredCandidate {
                                corners: *q,
                                score: score_breakdown(q, width, height, &cfg.scoring),
                            })
                            .collect::<Vec<_>>())
                    });
                    match scoring {
                        Ok(all) => {
                            scored = all;
                            let best = best_candidate(&scored);
                            let decision = decide(best.map(|b| b.confidence()), cfg);
                            debug!(
                                candidates = scored.len(),
                                best = best.map(|b| b.confidence()),
                                ?decision,
                                "Candidates scored"
                            );
                            match (decision, best) {
                                (Decision::Refine, Some(b)) => State::Refining(b),
                                (Decision::Accept, Some(b)) => State::Validating {
                                    corners: b.corners,
                                    confidence: b.confidence(),
                                },
                                _ => {
                                    warn!(
                                        best = best.map(|b| b.confidence()),
                                        "No candidate above the accept threshold; \
                                         using fallback corners"
                                    );
                                    State::FallingBack {
                                        confidence: cfg.fallback.confidence,
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Candidate scoring failed");
                            failure = Some(e.to_string());
                            State::FallingBack { confidence: 0.0 }
                        }
                    }
                }

                State::Refining(best) => {
                    let outcome: Result<RefinedCorners> = guarded(|| {
                        Ok(refine_corners(
                            image,
                            &best.corners,
                            &cfg.refine,
                            self.primitives.subpixel.as_ref(),
                        ))
                    });
                    match outcome {
                        Ok(r) => {
                            refined = Some(r.refined);
                            let confidence = if r.all_refined() {
                                (best.confidence() + cfg.refine.confidence_bonus).min(1.0)
                            } else {
                                best.confidence()
                            };
                            State::Validating {
                                corners: r.corners,
                                confidence,
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Corner refinement failed");
                            failure = Some(e.to_string());
                            State::FallingBack { confidence: 0.0 }
                        }
                    }
                }

                State::FallingBack { confidence } => State::Validating {
                    corners: fallback_corners(width, height, &cfg.fallback),
                    confidence,
                },

                State::Validating { corners, confidence } => {
                    let validated = validate_corners(*corners.points(), width, height);
                    adjustments = validated.adjustments;
                    State::Done(DetectionResult {
                        corners: Quad::new(validated.points),
                        confidence,
                    })
                }

                State::Done(result) => break result,
            };
        };

        info!(
            confidence = result.confidence,
            corners = ?result.corners,
            "Corner detection finished"
        );

        DetectionReport {
            result,
            stages,
            candidates: scored,
            refined,
            adjustments,
            failure,
        }
    }
}

/// Detect corners with the default configuration and backend.
pub fn detect_corners(image: &DynamicImage) -> DetectionResult {
    CornerDetector::default().detect(image)
}

/// Highest-scoring candidate with a strictly positive confidence; the first
/// one wins a tie.
fn best_candidate(scored: &[ScoredCandidate]) -> Option<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;
    for candidate in scored {
        let bar = best.map_or(0.0, |b| b.confidence());
        if candidate.confidence() > bar {
            best = Some(*candidate);
        }
    }
    best
}

/// Run `f`, turning a panic into a `DetectionFailure` that is logged at
/// warn level.
///
/// The process panic hook still runs before the unwind is caught, so the
/// default hook prints the panic to stderr. Embedders that want the log
/// line only should install their own hook with `std::panic::set_hook`.
fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(panic = %message, "Vision primitive panicked; detection aborted");
            Err(KeystoneError::DetectionFailure(format!("panic: {message}")))
        }
    }
}
