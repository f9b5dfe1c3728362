// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, perspective-correct, shrink for preview and
// encode. Operates on in-memory images using the `image` crate.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use keystone_core::error::{KeystoneError, Result};
use keystone_core::{DetectionResult, Point};
use tracing::{debug, info, instrument};

use crate::correct::crop_quadrilateral_with;
use crate::detect::CornerDetector;
use crate::primitives::{ImageprocBackend, ProjectiveSolver};

/// Processing pipeline operating on a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, so a
/// whole correction reads as one chain:
///
/// ```ignore
/// let jpeg = ImageProcessor::open("slide.jpg")?
///     .correct(&corners)?
///     .shrink_to_fit(800)
///     .to_jpeg_bytes(90)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            KeystoneError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| KeystoneError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Run corner detection on the current image.
    pub fn detect(&self, detector: &CornerDetector) -> DetectionResult {
        detector.detect(&self.image)
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Validate `corners` against the image and warp the enclosed
    /// quadrilateral to a fronto-parallel rectangle.
    pub fn correct(self, corners: &[Point]) -> Result<Self> {
        self.correct_with(corners, &ImageprocBackend)
    }

    /// [`correct`](Self::correct) through an explicit projection backend,
    /// e.g. `detector.primitives().projection.as_ref()`.
    #[instrument(skip_all, fields(corners = corners.len()))]
    pub fn correct_with(self, corners: &[Point], solver: &dyn ProjectiveSolver) -> Result<Self> {
        let warped = crop_quadrilateral_with(&self.image, corners, solver)?;
        Ok(Self { image: warped })
    }

    /// Shrink so the longer side is at most `max_side`, preserving aspect
    /// ratio with integer truncation. Never enlarges.
    #[instrument(skip(self), fields(max_side))]
    pub fn shrink_to_fit(self, max_side: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        if max_side == 0 || w.max(h) <= max_side {
            return self;
        }
        let (nw, nh) = if w > h {
            (max_side, (h as u64 * max_side as u64 / w as u64) as u32)
        } else {
            ((w as u64 * max_side as u64 / h as u64) as u32, max_side)
        };
        let (nw, nh) = (nw.max(1), nh.max(1));
        info!(from_w = w, from_h = h, to_w = nw, to_h = nh, "Shrinking image");
        Self {
            image: self.image.resize_exact(nw, nh, FilterType::Lanczos3),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|err| KeystoneError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.image.save(path.as_ref()).map_err(|err| {
            KeystoneError::ImageError(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| KeystoneError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
