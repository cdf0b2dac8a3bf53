//! Retime a video to 1 fps and burn in frame-index labels.
//!
//! Retiming multiplies every timestamp by the native frame rate, so frame
//! `i` lands at second `i`; sampling at 1 fps then keeps each original frame
//! exactly once. The label drawn on frame `i` reads `Frame i`.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempPath;

use brushscan_core::error::CoreError;
use brushscan_core::media::{MediaError, MediaInfo, MediaProcessor, TextOverlay, TranscodeRequest};
use brushscan_core::types::{PreprocessedVideo, Ratio, VideoJob};

use crate::error::PreprocessError;

/// Output rate of every preprocessed video.
pub const PREPROCESSED_FPS: u32 = 1;

pub struct MediaPreprocessor {
    media: Arc<dyn MediaProcessor>,
}

impl MediaPreprocessor {
    pub fn new(media: Arc<dyn MediaProcessor>) -> Self {
        Self { media }
    }

    /// Produce `job.labeled_path()` from the job's source video.
    ///
    /// The job's output directory must exist. On failure no output file is
    /// left behind, and the retimed intermediate never survives either way.
    pub async fn preprocess(&self, job: &VideoJob) -> Result<PreprocessedVideo, PreprocessError> {
        let output = job.labeled_path();
        let result = self.produce(job, &output).await;

        if result.is_err() {
            remove_partial(&output).await;
        }
        result
    }

    async fn produce(&self, job: &VideoJob, output: &Path) -> Result<PreprocessedVideo, PreprocessError> {
        let source_info = self.media.probe(&job.source_path).await?;
        let rate = native_rate(&source_info)?;
        tracing::debug!(
            video = %job.video_name(),
            rate = %rate,
            frames = ?source_info.frame_count,
            "Probed source video",
        );

        // Keeps the intermediate alive until labeling is done; removed on drop.
        let retimed: Option<TempPath> = if rate.is_one() {
            None
        } else {
            let temp = intermediate_path(job)?;
            let request = TranscodeRequest::new(&job.source_path, temp.to_path_buf())
                .with_pts_scale(rate)
                .with_output_fps(PREPROCESSED_FPS);
            self.media.transcode(&request).await?;
            Some(temp)
        };

        let label_input: &Path = retimed.as_deref().unwrap_or(job.source_path.as_path());
        let request = TranscodeRequest::new(label_input, output)
            .with_overlay(TextOverlay::frame_label());
        self.media.transcode(&request).await?;
        drop(retimed);

        if !tokio::fs::try_exists(output).await? {
            return Err(PreprocessError::MissingOutput(output.to_path_buf()));
        }

        let output_info = self.media.probe(output).await?;
        let frame_count = checked_frame_count(&source_info, &output_info)?;

        tracing::info!(video = %job.video_name(), frames = frame_count, "Preprocessed video");
        Ok(PreprocessedVideo {
            path: output.to_path_buf(),
            frame_count,
            fps: PREPROCESSED_FPS,
        })
    }
}

/// Exact native frame rate from probe data; never defaulted.
pub fn native_rate(info: &MediaInfo) -> Result<Ratio, PreprocessError> {
    let raw = info.frame_rate.as_deref().ok_or_else(|| {
        PreprocessError::RateDetection(CoreError::InvalidFrameRate {
            raw: String::new(),
            reason: "no video stream frame rate reported",
        })
    })?;
    Ratio::parse_frame_rate(raw).map_err(PreprocessError::RateDetection)
}

/// Frame count of the preprocessed output, enforcing that it matches the source.
pub fn checked_frame_count(source: &MediaInfo, output: &MediaInfo) -> Result<u64, PreprocessError> {
    match (source.frame_count, output.frame_count) {
        (Some(expected), Some(actual)) if expected != actual => {
            Err(PreprocessError::FrameCountMismatch { expected, actual })
        }
        (_, Some(count)) | (Some(count), None) => Ok(count),
        (None, None) => Err(PreprocessError::Media(MediaError::ParseError(
            "frame count unavailable for source and output".into(),
        ))),
    }
}

fn intermediate_path(job: &VideoJob) -> Result<TempPath, PreprocessError> {
    let file = tempfile::Builder::new()
        .prefix(&format!(".{}_retimed_", job.stem))
        .suffix(&format!(".{}", job.extension()))
        .tempfile_in(&job.output_dir)?;
    Ok(file.into_temp_path())
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}
