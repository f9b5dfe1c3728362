// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry module — canonical corner ordering and image-bounds validation.

pub mod bounds;
pub mod order;

pub use bounds::{ValidatedCorners, validate_corners};
pub use order::canonicalize;
