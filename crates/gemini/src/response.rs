//! Tolerant parsing of model output into a [`DetectionResult`].
//!
//! Malformed-but-received output never fails a job: anything that is not a
//! valid in-range frame index degrades to `null`, and the reason is appended
//! to `notes`.

use serde_json::{Map, Value};

use brushscan_core::types::{DetectionResult, FrameIndex, Side};

/// Longest excerpt of unparseable model text kept in notes.
const MAX_EXCERPT_CHARS: usize = 200;

/// Why a raw response could not be read as a JSON object.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("model returned non-JSON output: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("model returned JSON {0} instead of an object")]
    NotAnObject(&'static str),
}

/// Parse raw model text for `video`, whose preprocessed form has
/// `frame_count` frames.
pub fn parse_detection(raw: &str, video: &str, frame_count: u64) -> DetectionResult {
    let object = match parse_object(raw) {
        Ok(object) => object,
        Err(e) => {
            tracing::warn!(video, error = %e, "Unparseable detection response");
            return DetectionResult {
                video: video.to_string(),
                left: None,
                right: None,
                notes: format!("{e}; raw response: {}", excerpt(raw)),
            };
        }
    };

    let mut coercions = Vec::new();
    let mut index_for = |side: Side| match coerce_index(object.get(side.key()), frame_count) {
        Ok(index) => index,
        Err(reason) => {
            coercions.push(format!("{side} set to null: {reason}"));
            None
        }
    };
    let left = index_for(Side::Left);
    let right = index_for(Side::Right);

    let model_notes = match object.get("notes") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };

    if !coercions.is_empty() {
        tracing::warn!(video, coercions = ?coercions, "Coerced detection fields to null");
    }

    DetectionResult {
        video: video.to_string(),
        left,
        right,
        notes: join_notes(model_notes, &coercions),
    }
}

/// Read `raw` as a JSON object, tolerating a surrounding markdown fence.
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, ParseError> {
    match serde_json::from_str::<Value>(strip_code_fence(raw))? {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(ParseError::NotAnObject("array")),
        Value::String(_) => Err(ParseError::NotAnObject("string")),
        Value::Number(_) => Err(ParseError::NotAnObject("number")),
        Value::Bool(_) => Err(ParseError::NotAnObject("boolean")),
        Value::Null => Err(ParseError::NotAnObject("null")),
    }
}

/// Validate one side's value: absent and `null` mean "no event"; anything
/// else must be a non-negative integer below `frame_count`. A float with
/// no fractional part (`42.0`) counts as an integer.
pub fn coerce_index(value: Option<&Value>, frame_count: u64) -> Result<Option<FrameIndex>, String> {
    match value {
        None => Err("missing from response".into()),
        Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_u64().or_else(|| integral_f64(n)) {
            Some(index) if index < frame_count => Ok(Some(index)),
            Some(index) => Err(format!(
                "index {index} is outside the video (frames 0..{frame_count})"
            )),
            None => Err(format!("{n} is not a non-negative integer frame index")),
        },
        Some(other) => Err(format!("{other} is not an integer frame index")),
    }
}

fn integral_f64(n: &serde_json::Number) -> Option<u64> {
    let value = n.as_f64()?;
    (value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64).then_some(value as u64)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn join_notes(model_notes: String, coercions: &[String]) -> String {
    let mut parts = Vec::with_capacity(coercions.len() + 1);
    if !model_notes.is_empty() {
        parts.push(model_notes);
    }
    parts.extend(coercions.iter().cloned());
    parts.join("; ")
}

fn excerpt(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= MAX_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(MAX_EXCERPT_CHARS).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let result = parse_detection(
            r#"{"L": 42, "R": 87, "notes": "clear contacts"}"#,
            "trial.mp4",
            120,
        );
        assert_eq!(result.video, "trial.mp4");
        assert_eq!(result.left, Some(42));
        assert_eq!(result.right, Some(87));
        assert_eq!(result.notes, "clear contacts");
    }

    #[test]
    fn explicit_nulls_are_kept_without_extra_notes() {
        let result = parse_detection(
            r#"{"L": null, "R": 3, "notes": "L brushed twice"}"#,
            "v.mp4",
            10,
        );
        assert_eq!(result.left, None);
        assert_eq!(result.right, Some(3));
        assert_eq!(result.notes, "L brushed twice");
    }

    #[test]
    fn string_index_is_coerced_with_note() {
        let result = parse_detection(r#"{"L": "unknown", "R": 5, "notes": ""}"#, "v.mp4", 10);
        assert_eq!(result.left, None);
        assert_eq!(result.right, Some(5));
        assert!(!result.notes.is_empty());
        assert!(result.notes.contains("L set to null"));
        assert!(result.notes.contains("\"unknown\""));
    }

    #[test]
    fn out_of_range_and_negative_indices_are_coerced() {
        let result = parse_detection(r#"{"L": 10, "R": -1, "notes": "ok"}"#, "v.mp4", 10);
        assert_eq!(result.left, None);
        assert_eq!(result.right, None);
        assert!(result.notes.starts_with("ok; "));
        assert!(result.notes.contains("outside the video"));
        assert!(result.notes.contains("R set to null"));
    }

    #[test]
    fn fractional_index_is_coerced() {
        let result = parse_detection(r#"{"L": 4.5, "R": null, "notes": ""}"#, "v.mp4", 10);
        assert_eq!(result.left, None);
        assert!(result.notes.contains("not a non-negative integer"));
    }

    #[test]
    fn integral_float_index_is_accepted() {
        let result = parse_detection(r#"{"L": 4.0, "R": 12.0, "notes": ""}"#, "v.mp4", 10);
        assert_eq!(result.left, Some(4));
        assert_eq!(result.right, None);
        assert!(!result.notes.contains("L set to null"));
        assert!(result.notes.contains("outside the video"));

        let result = parse_detection(r#"{"L": -0.0, "R": -2.0, "notes": ""}"#, "v.mp4", 10);
        assert_eq!(result.left, Some(0));
        assert_eq!(result.right, None);
    }

    #[test]
    fn range_array_is_coerced() {
        let result = parse_detection(r#"{"L": [3, 6], "R": null, "notes": ""}"#, "v.mp4", 10);
        assert_eq!(result.left, None);
        assert!(result.notes.contains("[3,6]"));
    }

    #[test]
    fn missing_side_is_noted() {
        let result = parse_detection(r#"{"R": 2}"#, "v.mp4", 10);
        assert_eq!(result.left, None);
        assert_eq!(result.right, Some(2));
        assert_eq!(result.notes, "L set to null: missing from response");
    }

    #[test]
    fn non_string_notes_are_stringified() {
        let result = parse_detection(r#"{"L": 1, "R": 2, "notes": {"k": 1}}"#, "v.mp4", 10);
        assert_eq!(result.notes, r#"{"k":1}"#);
    }

    #[test]
    fn fenced_json_is_accepted() {
        let raw = "```json\n{\"L\": 1, \"R\": null, \"notes\": \"n\"}\n```";
        let result = parse_detection(raw, "v.mp4", 10);
        assert_eq!(result.left, Some(1));
        assert_eq!(result.notes, "n");
    }

    #[test]
    fn non_json_degrades_to_nulls() {
        let result = parse_detection("I could not see any mice.", "v.mp4", 10);
        assert_eq!(result.left, None);
        assert_eq!(result.right, None);
        assert!(result.notes.contains("non-JSON"));
        assert!(result.notes.contains("I could not see any mice."));
    }

    #[test]
    fn json_array_degrades_to_nulls() {
        let result = parse_detection("[1, 2]", "v.mp4", 10);
        assert_eq!(result.left, None);
        assert!(result.notes.contains("array instead of an object"));
    }

    #[test]
    fn long_raw_output_is_truncated_in_notes() {
        let raw = "x".repeat(1000);
        let result = parse_detection(&raw, "v.mp4", 10);
        assert!(result.notes.len() < 600);
        assert!(result.notes.ends_with("..."));
    }
}
