//! Highlighted visualization of detected contact frames.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use brushscan_core::highlight::VisualizationSpec;
use brushscan_core::media::{MediaProcessor, TextOverlay, TranscodeRequest};
use brushscan_core::types::{PreprocessedVideo, Ratio};

use crate::error::RenderError;

pub struct VisualizationRenderer {
    media: Arc<dyn MediaProcessor>,
}

impl VisualizationRenderer {
    pub fn new(media: Arc<dyn MediaProcessor>) -> Self {
        Self { media }
    }

    /// Render `video` to `output`, playing at `fps`.
    ///
    /// Every frame's label is redrawn over the preprocessing label; frames
    /// inside any brushed range of `spec` get the alert color. The label
    /// values are not recomputed, so they stay identical to the ones
    /// burned in during preprocessing.
    pub async fn render(
        &self,
        video: &PreprocessedVideo,
        spec: &VisualizationSpec,
        fps: u32,
        output: &Path,
    ) -> Result<PathBuf, RenderError> {
        let request = visualization_request(video, spec, fps, output)?;

        if let Err(e) = self.media.transcode(&request).await {
            if let Err(rm) = tokio::fs::remove_file(output).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %output.display(), error = %rm, "Failed to remove partial visualization");
                }
            }
            return Err(e.into());
        }

        tracing::info!(
            video = %video.path.display(),
            alert_frames = spec.alert_frames(video.frame_count).len(),
            fps,
            "Rendered visualization",
        );
        Ok(output.to_path_buf())
    }
}

/// Transcode request for a visualization at `fps` from a 1 fps labeled video.
pub fn visualization_request(
    video: &PreprocessedVideo,
    spec: &VisualizationSpec,
    fps: u32,
    output: &Path,
) -> Result<TranscodeRequest, RenderError> {
    let speedup = Ratio::reciprocal_of(fps)?;
    let overlay = TextOverlay::frame_label()
        .opaque()
        .highlighted(spec.merged_ranges());

    Ok(TranscodeRequest::new(&video.path, output)
        .with_pts_scale(speedup)
        .with_output_fps(fps)
        .with_overlay(overlay))
}
