// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Default corners used when detection finds nothing usable.

use keystone_core::config::FallbackConfig;
use keystone_core::{Point, Quad};

/// A centred rectangle inset by fixed fractions of the image size.
///
/// With the default 8% / 12% margins an 800x600 image yields
/// `(64, 72) (736, 72) (736, 528) (64, 528)`.
pub fn fallback_corners(width: u32, height: u32, config: &FallbackConfig) -> Quad {
    let (w, h) = (width as f64, height as f64);
    let mx = w * config.margin_x_ratio;
    let my = h * config.margin_y_ratio;
    let (left, right) = (mx as f32, (w - mx) as f32);
    let (top, bottom) = (my as f32, (h - my) as f32);
    Quad::new([
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_margins_on_800x600() {
        let q = fallback_corners(800, 600, &FallbackConfig::default());
        assert_eq!(
            q,
            Quad::new([
                Point::new(64.0, 72.0),
                Point::new(736.0, 72.0),
                Point::new(736.0, 528.0),
                Point::new(64.0, 528.0),
            ])
        );
    }

    #[test]
    fn custom_margins() {
        let cfg = FallbackConfig {
            margin_x_ratio: 0.25,
            margin_y_ratio: 0.0,
            ..FallbackConfig::default()
        };
        let q = fallback_corners(100, 40, &cfg);
        assert_eq!(q.top_left(), Point::new(25.0, 0.0));
        assert_eq!(q.bottom_right(), Point::new(75.0, 40.0));
    }

    #[test]
    fn empty_image_collapses_to_origin() {
        let q = fallback_corners(0, 0, &FallbackConfig::default());
        assert!(q.points().iter().all(|p| *p == Point::new(0.0, 0.0)));
    }
}
