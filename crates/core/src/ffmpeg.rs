//! FFmpeg/FFprobe implementation of [`MediaProcessor`].
//!
//! Filter graphs and argument lists are built by pure functions so the
//! exact command line can be tested without the binaries installed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::highlight::FrameRange;
use crate::media::{MediaError, MediaInfo, MediaProcessor, TextOverlay, TranscodeRequest, FRAME_LABEL_TEXT};

/// Env var overriding the `ffmpeg` binary.
pub const FFMPEG_ENV: &str = "BRUSHSCAN_FFMPEG";

/// Env var overriding the `ffprobe` binary.
pub const FFPROBE_ENV: &str = "BRUSHSCAN_FFPROBE";

/// Only the tail of stderr is kept in errors; ffmpeg prints its banner first.
const MAX_STDERR_CHARS: usize = 2000;

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-of json -show_entries stream=...`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
}

/// A single video stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    /// Container-declared frame count; missing for some containers.
    pub nb_frames: Option<String>,
    /// Decoded frame count, present when probing with `-count_frames`.
    pub nb_read_frames: Option<String>,
}

// ---------------------------------------------------------------------------
// FfmpegProcessor
// ---------------------------------------------------------------------------

/// Runs the `ffmpeg` / `ffprobe` command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegProcessor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegProcessor {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Binaries from [`FFMPEG_ENV`] / [`FFPROBE_ENV`], defaulting to `PATH` lookup.
    pub fn from_env() -> Self {
        let ffmpeg = std::env::var(FFMPEG_ENV).unwrap_or_else(|_| "ffmpeg".into());
        let ffprobe = std::env::var(FFPROBE_ENV).unwrap_or_else(|_| "ffprobe".into());
        Self::new(ffmpeg, ffprobe)
    }
}

impl Default for FfmpegProcessor {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        ensure_exists(path)?;

        let output = tokio::process::Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_frames",
                "-show_entries",
                "stream=r_frame_rate,nb_frames,nb_read_frames",
                "-of",
                "json",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(MediaError::NotFound)?;

        if !output.status.success() {
            return Err(MediaError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let probe = serde_json::from_str::<FfprobeOutput>(&stdout)
            .map_err(|e| MediaError::ParseError(format!("{e}: {stdout}")))?;
        Ok(media_info(&probe))
    }

    async fn transcode(&self, request: &TranscodeRequest) -> Result<(), MediaError> {
        ensure_exists(&request.input)?;

        let args = transcode_args(request);
        let filter = filter_chain(request).unwrap_or_default();
        tracing::debug!(
            input = %request.input.display(),
            output = %request.output.display(),
            filter = %filter,
            "Running ffmpeg",
        );

        let output = tokio::process::Command::new(&self.ffmpeg)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(MediaError::NotFound)?;

        if !output.status.success() {
            return Err(MediaError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        if !tokio::fs::try_exists(&request.output).await? {
            return Err(MediaError::MissingOutput(request.output.clone()));
        }
        Ok(())
    }
}

fn ensure_exists(path: &Path) -> Result<(), MediaError> {
    if !path.exists() {
        return Err(MediaError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim_end();
    let skip = text.chars().count().saturating_sub(MAX_STDERR_CHARS);
    text.chars().skip(skip).collect()
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Extract the frame rate and frame count of the first video stream.
///
/// The decoded count (`nb_read_frames`) wins over the container count.
pub fn media_info(probe: &FfprobeOutput) -> MediaInfo {
    let Some(stream) = probe.streams.first() else {
        return MediaInfo::default();
    };
    let parse_count = |s: &Option<String>| s.as_deref().and_then(|v| v.trim().parse::<u64>().ok());

    MediaInfo {
        frame_rate: stream.r_frame_rate.clone(),
        frame_count: parse_count(&stream.nb_read_frames).or_else(|| parse_count(&stream.nb_frames)),
    }
}

// ---------------------------------------------------------------------------
// Command builders
// ---------------------------------------------------------------------------

/// A `drawtext` filter drawing the frame label in the top-right corner.
pub fn drawtext_filter(overlay: &TextOverlay, font_color: &str, enable: Option<&str>) -> String {
    let mut filter = format!(
        "drawtext=text='{FRAME_LABEL_TEXT}':start_number=0:x=W-tw-20:y=20\
         :fontsize={}:box=1:boxcolor={}:boxborderw=8:fontcolor={font_color}",
        overlay.font_size, overlay.box_color,
    );
    if let Some(expr) = enable {
        filter.push_str(":enable=");
        filter.push_str(expr);
    }
    filter
}

/// Expression that is non-zero for frames inside any of `ranges`.
///
/// Commas are escaped as `\,` so the filtergraph parser hands them to the
/// expression evaluator intact.
pub fn highlight_expr(ranges: &[FrameRange]) -> Option<String> {
    let parts: Vec<String> = ranges
        .iter()
        .filter_map(|r| r.last().map(|last| format!("between(n\\,{}\\,{last})", r.start)))
        .collect();
    (!parts.is_empty()).then(|| parts.join("+"))
}

/// The drawtext passes for an overlay: one neutral pass, or a neutral pass
/// for ordinary frames plus an alert pass for highlighted frames.
pub fn overlay_filters(overlay: &TextOverlay) -> Vec<String> {
    let expr = overlay
        .highlight
        .as_ref()
        .and_then(|h| highlight_expr(&h.ranges).map(|e| (h, e)));

    match expr {
        None => vec![drawtext_filter(overlay, &overlay.font_color, None)],
        Some((highlight, expr)) => vec![
            drawtext_filter(overlay, &overlay.font_color, Some(&format!("not({expr})"))),
            drawtext_filter(overlay, &highlight.font_color, Some(&expr)),
        ],
    }
}

/// Full `-vf` filter chain for a request, or `None` when no filter is needed.
///
/// Labels are drawn before retiming so `n` always counts input frames.
pub fn filter_chain(request: &TranscodeRequest) -> Option<String> {
    let mut filters = request
        .overlay
        .as_ref()
        .map(overlay_filters)
        .unwrap_or_default();
    if let Some(scale) = request.pts_scale {
        filters.push(format!("setpts={scale}*PTS"));
    }
    (!filters.is_empty()).then(|| filters.join(","))
}

/// Complete ffmpeg argument list for a request.
pub fn transcode_args(request: &TranscodeRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-v", "error", "-i"].iter().map(OsString::from).collect();
    args.push(request.input.clone().into_os_string());
    if let Some(chain) = filter_chain(request) {
        args.push("-vf".into());
        args.push(chain.into());
    }
    if let Some(fps) = request.output_fps {
        args.push("-r".into());
        args.push(fps.to_string().into());
    }
    args.push(request.output.clone().into_os_string());
    args
}
