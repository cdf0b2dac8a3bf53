//! Media-processing capability.
//!
//! The pipeline never talks to a media tool directly. It describes the
//! transformation it wants as a [`TranscodeRequest`] and hands it to a
//! [`MediaProcessor`], so the underlying tool (or a test double) can be
//! swapped without touching the job state machine.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::highlight::FrameRange;
use crate::types::Ratio;

/// Label text drawn on each frame; `%{n}` expands to the 0-based frame number.
pub const FRAME_LABEL_TEXT: &str = "Frame %{n}";

/// Font size of the burned-in frame label.
pub const LABEL_FONT_SIZE: u32 = 48;

/// Label color for ordinary frames.
pub const NEUTRAL_COLOR: &str = "white";

/// Label color for frames inside a brushed range.
pub const ALERT_COLOR: &str = "red";

/// Semi-opaque label background used when labeling.
pub const LABEL_BOX_COLOR: &str = "black@0.6";

/// Opaque label background used when re-labeling an already labeled video.
pub const OPAQUE_BOX_COLOR: &str = "black@1.0";

/// Error type for media-processing operations.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media tool binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("media tool failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("media tool produced no output file at {0}")]
    MissingOutput(PathBuf),

    #[error("failed to parse probe output: {0}")]
    ParseError(String),

    #[error("video file not found: {0}")]
    VideoNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Stream facts needed to retime a video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    /// Native frame rate exactly as reported by the tool, e.g. `"30000/1001"`.
    pub frame_rate: Option<String>,
    /// Number of video frames, if the tool could determine it.
    pub frame_count: Option<u64>,
}

/// Alternate label coloring for a set of frame ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub font_color: String,
    pub ranges: Vec<FrameRange>,
}

/// Frame-index label burned into every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOverlay {
    pub font_size: u32,
    pub font_color: String,
    pub box_color: String,
    pub highlight: Option<Highlight>,
}

impl TextOverlay {
    /// The standard white-on-translucent frame label.
    pub fn frame_label() -> Self {
        Self {
            font_size: LABEL_FONT_SIZE,
            font_color: NEUTRAL_COLOR.to_string(),
            box_color: LABEL_BOX_COLOR.to_string(),
            highlight: None,
        }
    }

    /// Use a fully opaque box so a previous label at the same spot is covered.
    pub fn opaque(mut self) -> Self {
        self.box_color = OPAQUE_BOX_COLOR.to_string();
        self
    }

    /// Draw labels inside `ranges` in the alert color. Empty ranges are dropped.
    pub fn highlighted(mut self, ranges: Vec<FrameRange>) -> Self {
        let ranges: Vec<FrameRange> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
        self.highlight = (!ranges.is_empty()).then(|| Highlight {
            font_color: ALERT_COLOR.to_string(),
            ranges,
        });
        self
    }
}

/// One invocation of the media tool: read `input`, write `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Multiply every presentation timestamp by this factor.
    pub pts_scale: Option<Ratio>,
    /// Resample the output to this constant frame rate.
    pub output_fps: Option<u32>,
    /// Burn frame labels into every frame.
    pub overlay: Option<TextOverlay>,
}

impl TranscodeRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            pts_scale: None,
            output_fps: None,
            overlay: None,
        }
    }

    pub fn with_pts_scale(mut self, scale: Ratio) -> Self {
        self.pts_scale = Some(scale);
        self
    }

    pub fn with_output_fps(mut self, fps: u32) -> Self {
        self.output_fps = Some(fps);
        self
    }

    pub fn with_overlay(mut self, overlay: TextOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }
}

/// A tool able to probe and transcode video files.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Read the native frame rate and frame count of `path`.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError>;

    /// Produce `request.output` from `request.input`.
    ///
    /// Fails when the tool exits non-zero or leaves no output file.
    async fn transcode(&self, request: &TranscodeRequest) -> Result<(), MediaError>;
}
