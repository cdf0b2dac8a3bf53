//! Integration tests for command-line parsing.

use std::path::PathBuf;

use clap::Parser;

use brushscan_worker::cli::Args;

fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
    let mut argv = vec!["brushscan", "--input-dir", "in", "--output-dir", "out"];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv)
}

// ---------------------------------------------------------------------------
// Test: defaults
// ---------------------------------------------------------------------------

/// Only the two directories are required; everything else has a default.
#[test]
fn defaults_match_documented_values() {
    let args = parse(&[]).expect("minimal invocation should parse");

    assert_eq!(args.input_dir, PathBuf::from("in"));
    assert_eq!(args.output_dir, PathBuf::from("out"));
    assert_eq!(args.model, "gemini-3.1-pro-preview");
    assert_eq!(args.temperature, 0.0);
    assert!(!args.visualize);
    assert_eq!(args.n_brushed_frames, 5);
    assert_eq!(args.vis_fps, 10);
    assert_eq!(args.workers, 4);

    assert!(args.to_config().validate().is_ok());
}

/// Every flag is carried into the pipeline configuration.
#[test]
fn flags_reach_pipeline_config() {
    let args = parse(&[
        "--model",
        "gemini-custom",
        "--temperature",
        "0.5",
        "--visualize",
        "--n-brushed-frames",
        "3",
        "--vis-fps",
        "24",
        "--workers",
        "8",
    ])
    .unwrap();

    let config = args.to_config();
    assert_eq!(config.output_dir, PathBuf::from("out"));
    assert_eq!(config.model, "gemini-custom");
    assert_eq!(config.temperature, 0.5);
    assert!(config.visualize);
    assert_eq!(config.n_brushed_frames, 3);
    assert_eq!(config.vis_fps, 24);
    assert_eq!(config.workers, 8);
}

// ---------------------------------------------------------------------------
// Test: validation
// ---------------------------------------------------------------------------

/// Missing required directories are rejected.
#[test]
fn directories_are_required() {
    assert!(Args::try_parse_from(["brushscan", "--input-dir", "in"]).is_err());
    assert!(Args::try_parse_from(["brushscan", "--output-dir", "out"]).is_err());
}

/// Zero workers, frames or fps and out-of-range temperatures are rejected.
#[test]
fn out_of_range_values_are_rejected() {
    for bad in [
        ["--workers", "0"],
        ["--n-brushed-frames", "0"],
        ["--vis-fps", "0"],
        ["--temperature", "-1"],
        ["--temperature", "2.5"],
        ["--temperature", "warm"],
    ] {
        assert!(parse(&bad).is_err(), "{bad:?} should be rejected");
    }
}
