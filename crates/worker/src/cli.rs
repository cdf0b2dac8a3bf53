use std::path::PathBuf;

use clap::builder::RangedU64ValueParser;
use clap::Parser;

use brushscan_pipeline::config::{
    PipelineConfig, DEFAULT_MODEL, DEFAULT_N_BRUSHED_FRAMES, DEFAULT_TEMPERATURE, DEFAULT_VIS_FPS,
    DEFAULT_WORKERS, MAX_TEMPERATURE,
};

/// Detect the first full brush-contact frame per mouse in a folder of
/// experiment videos.
#[derive(Debug, Clone, Parser)]
#[command(name = "brushscan", version)]
pub struct Args {
    /// Directory scanned (non-recursively) for .mp4 .avi .mov .mkv .m4v files
    #[arg(long, value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Root directory; one sub-directory per video is created
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Remote model identifier
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature, 0 to 2
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, value_parser = parse_temperature)]
    pub temperature: f32,

    /// Also render a video with brushed frames highlighted
    #[arg(long)]
    pub visualize: bool,

    /// Number of frames highlighted per side, starting at the detected frame
    #[arg(
        long,
        default_value_t = DEFAULT_N_BRUSHED_FRAMES,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub n_brushed_frames: u64,

    /// Playback rate of the visualization video
    #[arg(
        long,
        default_value_t = DEFAULT_VIS_FPS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub vis_fps: u32,

    /// Number of videos processed at once
    #[arg(
        long,
        default_value_t = DEFAULT_WORKERS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub workers: usize,
}

impl Args {
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            output_dir: self.output_dir.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            visualize: self.visualize,
            n_brushed_frames: self.n_brushed_frames,
            vis_fps: self.vis_fps,
            workers: self.workers,
        }
    }
}

fn parse_temperature(raw: &str) -> Result<f32, String> {
    let value: f32 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if (0.0..=MAX_TEMPERATURE).contains(&value) {
        Ok(value)
    } else {
        Err(format!("must be between 0 and {MAX_TEMPERATURE}"))
    }
}
