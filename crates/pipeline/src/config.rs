//! Immutable settings shared by every job in a batch.

use std::path::PathBuf;

use brushscan_core::error::CoreError;

/// Remote model used when none is given.
pub const DEFAULT_MODEL: &str = "gemini-3.1-pro-preview";

pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Highlight window length per side.
pub const DEFAULT_N_BRUSHED_FRAMES: u64 = 5;

pub const DEFAULT_VIS_FPS: u32 = 10;

pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound accepted for `temperature`.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Batch configuration, built once and shared read-only via `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Root under which each job gets its own sub-directory.
    pub output_dir: PathBuf,
    pub model: String,
    pub temperature: f32,
    /// Render the highlighted visualization after detection.
    pub visualize: bool,
    pub n_brushed_frames: u64,
    /// Playback rate of the visualization video.
    pub vis_fps: u32,
    /// Maximum number of jobs running at once.
    pub workers: usize,
}

impl PipelineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            visualize: false,
            n_brushed_frames: DEFAULT_N_BRUSHED_FRAMES,
            vis_fps: DEFAULT_VIS_FPS,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.model.trim().is_empty() {
            return Err(CoreError::Validation("model name must not be empty".into()));
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(CoreError::Validation(format!(
                "temperature must be between 0 and {MAX_TEMPERATURE}, got {}",
                self.temperature
            )));
        }
        if self.n_brushed_frames == 0 {
            return Err(CoreError::Validation("n_brushed_frames must be at least 1".into()));
        }
        if self.vis_fps == 0 {
            return Err(CoreError::Validation("vis_fps must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(CoreError::Validation("workers must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::new("/tmp/out");
        assert!(config.validate().is_ok());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.n_brushed_frames, 5);
        assert_eq!(config.vis_fps, 10);
        assert_eq!(config.workers, 4);
        assert!(!config.visualize);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let base = PipelineConfig::new("/tmp/out");

        for config in [
            PipelineConfig { workers: 0, ..base.clone() },
            PipelineConfig { vis_fps: 0, ..base.clone() },
            PipelineConfig { n_brushed_frames: 0, ..base.clone() },
            PipelineConfig { temperature: -0.1, ..base.clone() },
            PipelineConfig { temperature: 2.5, ..base.clone() },
            PipelineConfig { temperature: f32::NAN, ..base.clone() },
            PipelineConfig { model: "  ".into(), ..base.clone() },
        ] {
            assert!(
                matches!(config.validate(), Err(CoreError::Validation(_))),
                "{config:?}"
            );
        }
    }
}
