// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Keystone — command-line corner detection and perspective correction.
//
// Entry point. Initialises logging, loads the optional JSON configuration and
// dispatches to the detect / warp / preview / config subcommands.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use keystone_core::human_errors::humanize_error;
use keystone_core::{KeystoneConfig, KeystoneError, Point, Quad, Trust};
use keystone_document::{CornerDetector, ImageProcessor, Primitives, preview_jpeg_with};
use serde::Serialize;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Parser)]
#[command(name = "keystone")]
#[command(about = "Find document corners in a photo and correct its perspective")]
#[command(version)]
struct Cli {
    /// JSON configuration file; built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect the four document corners and print them as JSON.
    Detect(DetectArgs),

    /// Warp the selected quadrilateral to a rectangle and save it.
    Warp(WarpArgs),

    /// Warp, shrink and encode a JPEG preview of the selection.
    Preview(WarpArgs),

    /// Write the default configuration as JSON.
    Config {
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Write the JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Include the stage trace and every scored candidate.
    #[arg(long)]
    report: bool,
}

#[derive(Debug, Clone, Args)]
struct WarpArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Corner as `x,y`; pass exactly four times, in any order.
    #[arg(long = "corner", value_parser = parse_point)]
    corners: Vec<Point>,

    /// Output file.
    #[arg(long)]
    out: PathBuf,
}

/// JSON shape of a detection on stdout.
#[derive(Debug, Serialize)]
struct DetectOutput {
    corners: Quad,
    confidence: f32,
    trust: Trust,
    message: String,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => KeystoneConfig::load(path).map_err(humanized)?,
        None => KeystoneConfig::default(),
    };

    match &cli.command {
        Commands::Detect(args) => run_detect(args, &config),
        Commands::Warp(args) => run_warp(args),
        Commands::Preview(args) => run_preview(args, &config),
        Commands::Config { out } => {
            config.persist(out).map_err(humanized)?;
            tracing::info!("Configuration written to {}", out.display());
            Ok(())
        }
    }
}

fn run_detect(args: &DetectArgs, config: &KeystoneConfig) -> CliResult<()> {
    let image = ImageProcessor::open(&args.image).map_err(humanized)?;
    let detector = CornerDetector::new(config.detection.clone());

    let json = if args.report {
        let report = detector.detect_with_report(image.as_dynamic());
        serde_json::to_string_pretty(&report)?
    } else {
        let result = image.detect(&detector);
        let output = DetectOutput {
            corners: result.corners,
            confidence: result.confidence,
            trust: result.trust(&config.detection),
            message: result.advice(&config.detection),
        };
        serde_json::to_string_pretty(&output)?
    };

    emit(&json, args.out.as_deref())
}

fn run_warp(args: &WarpArgs) -> CliResult<()> {
    let primitives = Primitives::default();
    let warped = ImageProcessor::open(&args.image)
        .and_then(|image| image.correct_with(&args.corners, primitives.projection.as_ref()))
        .map_err(humanized)?;
    warped.save(&args.out).map_err(humanized)?;
    tracing::info!(
        "Corrected {}x{} image written to {}",
        warped.width(),
        warped.height(),
        args.out.display()
    );
    Ok(())
}

fn run_preview(args: &WarpArgs, config: &KeystoneConfig) -> CliResult<()> {
    let primitives = Primitives::default();
    let image = ImageProcessor::open(&args.image).map_err(humanized)?;
    let jpeg = preview_jpeg_with(
        image.as_dynamic(),
        &args.corners,
        &config.preview,
        primitives.projection.as_ref(),
    )
    .map_err(humanized)?;
    std::fs::write(&args.out, &jpeg)?;
    tracing::info!("Preview ({} bytes) written to {}", jpeg.len(), args.out.display());
    Ok(())
}

fn emit(json: &str, out: Option<&Path>) -> CliResult<()> {
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Log the technical error and surface its plain-English form.
fn humanized(err: KeystoneError) -> CliError {
    tracing::debug!(error = %err, "Command failed");
    let human = humanize_error(&err);
    format!("{} {}", human.message, human.suggestion).into()
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let x: f32 = x.trim().parse().map_err(|e| format!("bad x in `{s}`: {e}"))?;
    let y: f32 = y.trim().parse().map_err(|e| format!("bad y in `{s}`: {e}"))?;
    Ok(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};

    fn write_card(dir: &Path) -> PathBuf {
        let path = dir.join("card.png");
        let img = GrayImage::from_fn(400, 300, |x, y| {
            if (80..320).contains(&x) && (60..240).contains(&y) {
                Luma([235u8])
            } else {
                Luma([25u8])
            }
        });
        DynamicImage::ImageLuma8(img).save(&path).unwrap();
        path
    }

    #[test]
    fn parses_points() {
        assert_eq!(parse_point("12.5, 7").unwrap(), Point::new(12.5, 7.0));
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn parses_warp_command() {
        let cli = Cli::try_parse_from([
            "keystone", "warp", "--image", "in.jpg", "--out", "out.png", "--corner", "0,0",
            "--corner", "10,0", "--corner", "10,10", "--corner", "0,10",
        ])
        .unwrap();
        match cli.command {
            Commands::Warp(args) => assert_eq!(args.corners.len(), 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let args = ["keystone", "detect", "--image", "a.png", "--config", "k.json"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("k.json")));
    }

    #[test]
    fn detect_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_card(dir.path());
        let out = dir.path().join("corners.json");
        let args = DetectArgs {
            image,
            out: Some(out.clone()),
            report: false,
        };
        run_detect(&args, &KeystoneConfig::default()).unwrap();

        let text = std::fs::read_to_string(out).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["corners"].as_array().map(Vec::len), Some(4));
        let confidence = value["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn warp_with_three_corners_is_invalid_selection() {
        let dir = tempfile::tempdir().unwrap();
        let args = WarpArgs {
            image: write_card(dir.path()),
            corners: vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(5.0, 5.0)],
            out: dir.path().join("out.png"),
        };
        let err = run_warp(&args).unwrap_err();
        assert!(err.to_string().starts_with("Invalid corner selection."));
    }

    #[test]
    fn preview_and_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("keystone.json");
        let cli = Cli {
            config: None,
            command: Commands::Config { out: cfg_path.clone() },
        };
        run(&cli).unwrap();

        let config = KeystoneConfig::load(&cfg_path).unwrap();
        let args = WarpArgs {
            image: write_card(dir.path()),
            corners: vec![
                Point::new(80.0, 60.0),
                Point::new(320.0, 60.0),
                Point::new(320.0, 240.0),
                Point::new(80.0, 240.0),
            ],
            out: dir.path().join("preview.jpg"),
        };
        run_preview(&args, &config).unwrap();
        let preview = ImageProcessor::open(&args.out).unwrap();
        assert_eq!((preview.width(), preview.height()), (240, 180));
    }
}
