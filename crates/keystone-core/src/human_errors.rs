// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the corner editor and CLI.
//
// Every technical error is mapped to plain English with a clear suggestion.

use crate::error::KeystoneError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user must change their input (move corners, pick another file).
    ActionRequired,
    /// Cannot be fixed by the user; the file or the environment is at fault.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `KeystoneError` into a `HumanError`.
pub fn humanize_error(err: &KeystoneError) -> HumanError {
    match err {
        KeystoneError::DegenerateGeometry(_) => HumanError {
            message: "Invalid corner selection.".into(),
            suggestion: "The four corners must enclose an area. Drag them apart so that no two corners overlap and they are not all on one line.".into(),
            severity: Severity::ActionRequired,
        },

        KeystoneError::InvalidCornerCount(count) => HumanError {
            message: "Invalid corner selection.".into(),
            suggestion: format!("Exactly four corners are needed, but {count} were given."),
            severity: Severity::ActionRequired,
        },

        // Never reaches callers of detection; mapped for completeness of logs.
        KeystoneError::DetectionFailure(_) => HumanError {
            message: "The document edges couldn't be found automatically.".into(),
            suggestion: "Place the four corners by hand.".into(),
            severity: Severity::ActionRequired,
        },

        KeystoneError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The file may be damaged or in an unsupported format. Try saving it as JPEG or PNG.".into(),
            severity: Severity::Permanent,
        },

        KeystoneError::Io(io) => HumanError {
            message: "A file couldn't be read or written.".into(),
            suggestion: format!("Check that the path exists and is writable. ({io})"),
            severity: Severity::Permanent,
        },

        KeystoneError::Serialization(_) => HumanError {
            message: "The settings file couldn't be understood.".into(),
            suggestion: "Fix the JSON syntax or delete the file to go back to the defaults.".into(),
            severity: Severity::Permanent,
        },
    }
}
