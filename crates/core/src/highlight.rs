//! Brushed-range computation for visualization.
//!
//! A detected contact frame `i` on a side highlights the half-open range
//! `[i, i + n)`. Highlighting is boolean per frame: a frame inside both an
//! L-range and an R-range is highlighted once.

use crate::types::{DetectionResult, FrameIndex, Side};

/// Half-open range of frame indices `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameRange {
    pub start: FrameIndex,
    pub end: FrameIndex,
}

impl FrameRange {
    pub fn new(start: FrameIndex, len: u64) -> Self {
        Self {
            start,
            end: start.saturating_add(len),
        }
    }

    pub fn contains(&self, frame: FrameIndex) -> bool {
        self.start <= frame && frame < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Inclusive last frame, or `None` for an empty range.
    pub fn last(&self) -> Option<FrameIndex> {
        (!self.is_empty()).then(|| self.end - 1)
    }
}

/// The set of brushed ranges derived from one detection result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisualizationSpec {
    pub brushed_ranges: Vec<(Side, FrameRange)>,
}

impl VisualizationSpec {
    /// Derive the brushed ranges for a result and window length `n`.
    ///
    /// A side contributes only when its index is present; `n == 0`
    /// highlights nothing.
    pub fn from_detection(result: &DetectionResult, n: u64) -> Self {
        let brushed_ranges = Side::ALL
            .iter()
            .filter_map(|&side| result.side(side).map(|start| (side, FrameRange::new(start, n))))
            .filter(|(_, range)| !range.is_empty())
            .collect();
        Self { brushed_ranges }
    }

    pub fn is_empty(&self) -> bool {
        self.brushed_ranges.is_empty()
    }

    /// Whether `frame` should be drawn in the alert color.
    pub fn is_alert(&self, frame: FrameIndex) -> bool {
        self.brushed_ranges
            .iter()
            .any(|(_, range)| range.contains(frame))
    }

    /// Whether `frame` falls in a range contributed by `side`.
    pub fn is_alert_for(&self, side: Side, frame: FrameIndex) -> bool {
        self.brushed_ranges
            .iter()
            .any(|(s, range)| *s == side && range.contains(frame))
    }

    /// Sorted, non-overlapping union of all brushed ranges.
    pub fn merged_ranges(&self) -> Vec<FrameRange> {
        let mut ranges: Vec<FrameRange> = self.brushed_ranges.iter().map(|(_, r)| *r).collect();
        ranges.sort();

        let mut merged: Vec<FrameRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(prev) if range.start <= prev.end => prev.end = prev.end.max(range.end),
                _ => merged.push(range),
            }
        }
        merged
    }

    /// Every alert-colored frame index below `frame_count`, ascending.
    pub fn alert_frames(&self, frame_count: u64) -> Vec<FrameIndex> {
        self.merged_ranges()
            .into_iter()
            .flat_map(|r| r.start..r.end.min(frame_count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(left: Option<u64>, right: Option<u64>) -> DetectionResult {
        DetectionResult {
            video: "v.mp4".into(),
            left,
            right,
            notes: String::new(),
        }
    }

    #[test]
    fn both_sides_highlight_their_window() {
        let spec = VisualizationSpec::from_detection(&result(Some(42), Some(87)), 5);

        for frame in 42..=46 {
            assert!(spec.is_alert(frame), "frame {frame} should be alert");
        }
        for frame in 87..=91 {
            assert!(spec.is_alert(frame), "frame {frame} should be alert");
        }
        for frame in [41, 47, 86, 92] {
            assert!(!spec.is_alert(frame), "frame {frame} should not be alert");
        }
    }

    #[test]
    fn null_side_contributes_nothing() {
        let spec = VisualizationSpec::from_detection(&result(None, Some(87)), 5);

        assert_eq!(spec.brushed_ranges.len(), 1);
        assert!((0..200).all(|f| !spec.is_alert_for(Side::Left, f)));
        assert_eq!(spec.alert_frames(200), vec![87, 88, 89, 90, 91]);
        assert!((87..=91).all(|f| spec.is_alert_for(Side::Right, f)));
    }

    #[test]
    fn overlapping_ranges_merge_once() {
        let spec = VisualizationSpec::from_detection(&result(Some(10), Some(12)), 5);

        assert_eq!(
            spec.merged_ranges(),
            vec![FrameRange { start: 10, end: 17 }]
        );
        assert_eq!(spec.alert_frames(100), (10..17).collect::<Vec<_>>());
        assert!(spec.is_alert_for(Side::Left, 13));
        assert!(spec.is_alert_for(Side::Right, 13));
    }

    #[test]
    fn adjacent_ranges_merge() {
        let spec = VisualizationSpec::from_detection(&result(Some(0), Some(5)), 5);
        assert_eq!(spec.merged_ranges(), vec![FrameRange { start: 0, end: 10 }]);
    }

    #[test]
    fn zero_window_highlights_nothing() {
        let spec = VisualizationSpec::from_detection(&result(Some(3), Some(4)), 0);
        assert!(spec.is_empty());
        assert!(spec.alert_frames(10).is_empty());
    }

    #[test]
    fn alert_frames_clip_to_video_length() {
        let spec = VisualizationSpec::from_detection(&result(Some(8), None), 5);
        assert_eq!(spec.alert_frames(10), vec![8, 9]);
    }

    #[test]
    fn range_last_is_inclusive_end() {
        assert_eq!(FrameRange::new(42, 5).last(), Some(46));
        assert_eq!(FrameRange::new(42, 0).last(), None);
    }

    #[test]
    fn range_saturates_at_max_index() {
        let range = FrameRange::new(u64::MAX - 1, 5);
        assert!(range.contains(u64::MAX - 1));
        assert_eq!(range.end, u64::MAX);
    }
}
