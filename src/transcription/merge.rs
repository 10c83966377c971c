//! Timestamp-correct merging of per-slice transcripts.
//!
//! Offsets are computed from the slice index and the fixed slice
//! duration (`offset_i = i * segment_duration_sec`), never by
//! accumulating provider-reported durations. Provider durations are
//! unreliable, and a failed slice would shift every later timestamp;
//! the fixed arithmetic keeps the timeline drift-free and tolerant of
//! gaps.

use super::{MergedTranscript, RawTranscript, TranscriptSegment};
use tracing::{debug, instrument};

/// Wrap a single-file response as a merged transcript. No offset
/// adjustment; duration and language come straight from the provider.
pub fn from_single(raw: RawTranscript, model: &str) -> MergedTranscript {
    MergedTranscript {
        text: raw.text,
        duration_sec: raw.duration_sec,
        language: raw.language,
        segments: raw.segments,
        total_segments: 1,
        segment_duration_sec: None,
        model: model.to_string(),
        processed: false,
    }
}

/// Merge per-slice results into one timeline.
///
/// `results` holds `(slice index, transcript)` pairs for the slices
/// that succeeded, in any order. `total` is the planned slice count
/// including failures; the merged duration is `total *
/// segment_duration_sec` regardless of which slices made it.
#[instrument(skip(results), fields(successes = results.len(), total))]
pub fn merge_segmented(
    mut results: Vec<(usize, RawTranscript)>,
    total: usize,
    segment_duration_sec: u32,
    model: &str,
) -> MergedTranscript {
    results.sort_by_key(|(index, _)| *index);

    let slice_duration = segment_duration_sec as f64;
    let mut segments: Vec<TranscriptSegment> = Vec::new();
    let mut text_blocks: Vec<String> = Vec::new();
    let mut language: Option<String> = None;

    for (index, raw) in results {
        let offset = index as f64 * slice_duration;
        debug!(index, offset, "Merging slice");

        if language.is_none() {
            language = raw.language.clone();
        }

        for mut segment in raw.segments {
            // Clamp before shifting; some providers emit tiny negative
            // starts at slice boundaries.
            segment.start = segment.start.max(0.0) + offset;
            segment.end = segment.end.max(0.0) + offset;
            for word in &mut segment.words {
                word.start = word.start.max(0.0) + offset;
                word.end = word.end.max(0.0) + offset;
            }
            segments.push(segment);
        }

        let block = raw.text.trim();
        if !block.is_empty() {
            if total > 1 {
                text_blocks.push(format!("=== 片段 {} ===\n{}", index + 1, block));
            } else {
                text_blocks.push(block.to_string());
            }
        }
    }

    MergedTranscript {
        text: text_blocks.join("\n\n"),
        duration_sec: total as f64 * slice_duration,
        language,
        segments,
        total_segments: total,
        segment_duration_sec: Some(slice_duration),
        model: model.to_string(),
        processed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::TranscriptWord;

    fn slice(texts: &[(f64, f64, &str)], language: Option<&str>) -> RawTranscript {
        let segments = texts
            .iter()
            .map(|(start, end, text)| TranscriptSegment::new(*start, *end, text.to_string()))
            .collect::<Vec<_>>();
        let text = texts
            .iter()
            .map(|(_, _, t)| *t)
            .collect::<Vec<_>>()
            .join(" ");
        RawTranscript {
            text,
            duration_sec: texts.last().map(|(_, end, _)| *end).unwrap_or(0.0),
            language: language.map(|l| l.to_string()),
            segments,
        }
    }

    #[test]
    fn test_single_passthrough() {
        let raw = slice(&[(0.0, 2.0, "hello"), (2.0, 5.0, "world")], Some("en"));
        let merged = from_single(raw, "whisper-1");
        assert_eq!(merged.total_segments, 1);
        assert_eq!(merged.duration_sec, 5.0);
        assert_eq!(merged.language.as_deref(), Some("en"));
        assert_eq!(merged.segments.len(), 2);
        assert!(merged.segment_duration_sec.is_none());
    }

    #[test]
    fn test_fixed_offsets() {
        let results = vec![
            (0, slice(&[(0.0, 10.0, "A")], Some("en"))),
            (1, slice(&[(0.0, 12.0, "B")], None)),
        ];
        let merged = merge_segmented(results, 2, 300, "whisper-1");

        assert_eq!(merged.segments[0].start, 0.0);
        assert_eq!(merged.segments[0].end, 10.0);
        assert_eq!(merged.segments[1].start, 300.0);
        assert_eq!(merged.segments[1].end, 312.0);
        assert_eq!(merged.duration_sec, 600.0);
        assert_eq!(merged.total_segments, 2);
    }

    #[test]
    fn test_failed_slice_leaves_gap_not_drift() {
        // Slice 1 failed; slice 2's timestamps still land at 600s.
        let results = vec![
            (0, slice(&[(0.0, 10.0, "first")], Some("en"))),
            (2, slice(&[(0.0, 8.0, "third")], None)),
        ];
        let merged = merge_segmented(results, 3, 300, "whisper-1");

        assert_eq!(merged.segments.len(), 2);
        assert_eq!(merged.segments[1].start, 600.0);
        assert_eq!(merged.segments[1].end, 608.0);
        // Duration reflects the planned slice count, not the survivors.
        assert_eq!(merged.duration_sec, 900.0);
        assert_eq!(merged.total_segments, 3);
    }

    #[test]
    fn test_merge_associativity_under_failure() {
        // Removing one slice's result changes only that slice's lines.
        let all = vec![
            (0, slice(&[(0.0, 10.0, "a")], Some("en"))),
            (1, slice(&[(0.0, 9.0, "b")], None)),
            (2, slice(&[(0.0, 8.0, "c")], None)),
        ];
        let without_middle = vec![all[0].clone(), all[2].clone()];

        let full = merge_segmented(all, 3, 300, "whisper-1");
        let gapped = merge_segmented(without_middle, 3, 300, "whisper-1");

        let full_rest: Vec<_> = full
            .segments
            .iter()
            .filter(|s| s.start < 300.0 || s.start >= 600.0)
            .collect();
        assert_eq!(full_rest.len(), gapped.segments.len());
        for (a, b) in full_rest.iter().zip(gapped.segments.iter()) {
            assert_eq!(a.start, b.start);
            assert_eq!(a.end, b.end);
            assert_eq!(a.text, b.text);
        }
        assert_eq!(full.duration_sec, gapped.duration_sec);
    }

    #[test]
    fn test_negative_timestamps_clamped_before_shift() {
        let mut raw = slice(&[(-0.4, 3.0, "start")], None);
        raw.segments[0].words = vec![TranscriptWord {
            word: "start".to_string(),
            start: -0.4,
            end: 0.6,
        }];
        let merged = merge_segmented(vec![(1, raw)], 2, 300, "whisper-1");

        assert_eq!(merged.segments[0].start, 300.0);
        assert_eq!(merged.segments[0].words[0].start, 300.0);
    }

    #[test]
    fn test_text_dividers_multi_slice_only() {
        let results = vec![
            (0, slice(&[(0.0, 10.0, "A")], None)),
            (1, slice(&[(0.0, 12.0, "B")], None)),
        ];
        let merged = merge_segmented(results, 2, 300, "whisper-1");
        assert!(merged.text.contains("=== 片段 1 ===\nA"));
        assert!(merged.text.contains("=== 片段 2 ===\nB"));

        let single = merge_segmented(vec![(0, slice(&[(0.0, 10.0, "A")], None))], 1, 300, "w");
        assert_eq!(single.text, "A");
    }

    #[test]
    fn test_language_from_first_successful_slice() {
        let results = vec![
            (1, slice(&[(0.0, 5.0, "b")], Some("no"))),
            (2, slice(&[(0.0, 5.0, "c")], Some("en"))),
        ];
        let merged = merge_segmented(results, 3, 300, "whisper-1");
        assert_eq!(merged.language.as_deref(), Some("no"));
    }

    #[test]
    fn test_monotone_timestamps_across_merge() {
        let results = vec![
            (0, slice(&[(0.0, 100.0, "a"), (100.0, 299.0, "b")], None)),
            (1, slice(&[(0.0, 150.0, "c"), (150.0, 280.0, "d")], None)),
        ];
        let merged = merge_segmented(results, 2, 300, "whisper-1");
        for pair in merged.segments.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
        for segment in &merged.segments {
            assert!(segment.end >= segment.start);
        }
    }
}
