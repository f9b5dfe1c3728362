// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the keystone-document crate: full corner
// detection on a synthetic photo and the perspective warp of its result.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use keystone_document::{CornerDetector, warp_quadrilateral};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 1920x1080 dark frame with a bright slide inset by 10% / 12%.
fn synthetic_slide() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(1920, 1080, |x, y| {
        if (192..1728).contains(&x) && (130..950).contains(&y) {
            Rgb([235, 235, 228])
        } else {
            Rgb([28, 30, 34])
        }
    }))
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_detect(c: &mut Criterion) {
    let image = synthetic_slide();
    let detector = CornerDetector::default();

    c.bench_function("detect_corners (1920x1080)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&image))));
    });
}

fn bench_warp(c: &mut Criterion) {
    let image = synthetic_slide();
    let corners = CornerDetector::default().detect(&image).corners;

    c.bench_function("warp_quadrilateral (1920x1080)", |b| {
        b.iter(|| black_box(warp_quadrilateral(black_box(&image), corners.0)));
    });
}

criterion_group!(benches, bench_detect, bench_warp);
criterion_main!(benches);
