//! Shared domain types for a batch run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 0-based ordinal position of a frame within the original video.
pub type FrameIndex = u64;

/// Extension used for job artifacts when the source file has none.
const DEFAULT_EXTENSION: &str = "mp4";

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which animal in the frame an event belongs to (screen-left / screen-right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    /// Key used for this side in `result.json` and model responses.
    pub fn key(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Ratio
// ---------------------------------------------------------------------------

/// An exact rational number such as a frame rate (`30000/1001`) or a
/// presentation-timestamp scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    pub num: u64,
    pub den: u64,
}

impl Ratio {
    pub fn new(num: u64, den: u64) -> Result<Self, CoreError> {
        if den == 0 {
            return Err(CoreError::InvalidFrameRate {
                raw: format!("{num}/{den}"),
                reason: "zero denominator",
            });
        }
        Ok(Self { num, den })
    }

    /// Parse a rational in ffprobe notation: `"30/1"`, `"24000/1001"` or a
    /// plain integer like `"25"`.
    ///
    /// Zero and malformed values are rejected rather than defaulted; a wrong
    /// value here silently corrupts every downstream frame index.
    pub fn parse_frame_rate(raw: &str) -> Result<Self, CoreError> {
        let invalid = |reason| CoreError::InvalidFrameRate {
            raw: raw.to_string(),
            reason,
        };

        let trimmed = raw.trim();
        let (num, den) = match trimmed.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (trimmed, "1"),
        };
        let num: u64 = num.parse().map_err(|_| invalid("numerator is not an integer"))?;
        let den: u64 = den
            .parse()
            .map_err(|_| invalid("denominator is not an integer"))?;

        if den == 0 {
            return Err(invalid("zero denominator"));
        }
        if num == 0 {
            return Err(invalid("zero frame rate"));
        }
        Ok(Self { num, den })
    }

    /// `1 / n`, used to speed playback up by an integer factor.
    pub fn reciprocal_of(n: u32) -> Result<Self, CoreError> {
        Self::new(1, u64::from(n))
    }

    pub fn is_one(&self) -> bool {
        self.num == self.den
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

// ---------------------------------------------------------------------------
// Jobs and artifacts
// ---------------------------------------------------------------------------

/// The unit of work for one input video.
///
/// Created at discovery time and owned by exactly one pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    /// Input video file.
    pub source_path: PathBuf,
    /// File stem used to name every artifact.
    pub stem: String,
    /// Exclusive output sub-directory for this job.
    pub output_dir: PathBuf,
}

impl VideoJob {
    pub fn new(source_path: PathBuf, stem: String, output_dir: PathBuf) -> Self {
        Self {
            source_path,
            stem,
            output_dir,
        }
    }

    /// Source file name, as recorded in `result.json`.
    pub fn video_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.stem.clone())
    }

    /// Lower-cased extension of the source, reused for every rendered artifact.
    pub fn extension(&self) -> String {
        extension_of(&self.source_path).unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }

    pub fn labeled_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_labeled.{}", self.stem, self.extension()))
    }

    pub fn visualization_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_vis.{}", self.stem, self.extension()))
    }

    pub fn result_path(&self) -> PathBuf {
        self.output_dir.join("result.json")
    }
}

/// Lower-cased file extension without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

/// A uniformly-timed video where frame `i` carries the burned-in label `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessedVideo {
    pub path: PathBuf,
    /// Equal to the frame count of the source video.
    pub frame_count: u64,
    pub fps: u32,
}

/// Detection outcome for one video, serialized verbatim as `result.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub video: String,
    #[serde(rename = "L")]
    pub left: Option<FrameIndex>,
    #[serde(rename = "R")]
    pub right: Option<FrameIndex>,
    pub notes: String,
}

impl DetectionResult {
    pub fn side(&self, side: Side) -> Option<FrameIndex> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_frame_rate_standard() {
        let rate = Ratio::parse_frame_rate("30/1").unwrap();
        assert_eq!(rate, Ratio { num: 30, den: 1 });
        assert_eq!(rate.to_string(), "30/1");
    }

    #[test]
    fn parse_frame_rate_ntsc_stays_exact() {
        let rate = Ratio::parse_frame_rate("30000/1001").unwrap();
        assert_eq!(rate.to_string(), "30000/1001");
        assert!((rate.as_f64() - 29.97).abs() < 0.01);
    }

    #[test]
    fn parse_frame_rate_plain_number() {
        assert_eq!(
            Ratio::parse_frame_rate(" 25 ").unwrap(),
            Ratio { num: 25, den: 1 }
        );
    }

    #[test]
    fn parse_frame_rate_rejects_zero_and_garbage() {
        for raw in ["0/0", "30/0", "0/1", "", "N/A", "29.97", "abc/1"] {
            assert!(
                Ratio::parse_frame_rate(raw).is_err(),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn ratio_is_one() {
        assert!(Ratio::parse_frame_rate("1/1").unwrap().is_one());
        assert!(Ratio::parse_frame_rate("2/2").unwrap().is_one());
        assert!(!Ratio::parse_frame_rate("30/1").unwrap().is_one());
    }

    #[test]
    fn reciprocal_rejects_zero() {
        assert!(Ratio::reciprocal_of(0).is_err());
        assert_eq!(Ratio::reciprocal_of(10).unwrap().to_string(), "1/10");
    }

    #[test]
    fn job_artifact_paths_follow_layout() {
        let job = VideoJob::new(
            PathBuf::from("/in/Trial_01.MOV"),
            "Trial_01".into(),
            PathBuf::from("/out/Trial_01"),
        );
        assert_eq!(job.video_name(), "Trial_01.MOV");
        assert_eq!(
            job.labeled_path(),
            PathBuf::from("/out/Trial_01/Trial_01_labeled.mov")
        );
        assert_eq!(
            job.visualization_path(),
            PathBuf::from("/out/Trial_01/Trial_01_vis.mov")
        );
        assert_eq!(job.result_path(), PathBuf::from("/out/Trial_01/result.json"));
    }

    #[test]
    fn detection_result_serializes_with_side_keys() {
        let result = DetectionResult {
            video: "a.mp4".into(),
            left: Some(42),
            right: None,
            notes: "R never brushed".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"video": "a.mp4", "L": 42, "R": null, "notes": "R never brushed"})
        );
    }
}
