//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// A single word with precise timing from provider word-level timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptWord {
    /// The word text.
    pub word: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

/// A single segment of a transcript with timestamp information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Transcribed text content.
    pub text: String,
    /// Word-level timestamps, when the provider returned them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<TranscriptWord>,
    /// Heuristic speaker label, when speaker labelling ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl TranscriptSegment {
    /// Create a new transcript segment without word timing.
    pub fn new(start: f64, end: f64, text: String) -> Self {
        Self {
            start,
            end,
            text,
            words: Vec::new(),
            speaker: None,
        }
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One provider response, before merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTranscript {
    /// Full transcript text.
    pub text: String,
    /// Provider-reported duration in seconds. Not reliable.
    pub duration_sec: f64,
    /// Provider-detected language, if reported.
    pub language: Option<String>,
    /// Segments with timestamps, in time order.
    pub segments: Vec<TranscriptSegment>,
}

impl RawTranscript {
    /// A transcript holding only plain text, used when the provider
    /// returned no segment timing.
    pub fn text_only(text: String, duration_sec: f64, language: Option<String>) -> Self {
        let segments = if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![TranscriptSegment::new(0.0, duration_sec, text.trim().to_string())]
        };
        Self {
            text,
            duration_sec,
            language,
            segments,
        }
    }
}

/// The merged, timeline-correct transcript for a whole job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedTranscript {
    /// Full transcript text, with slice dividers when multi-slice.
    pub text: String,
    /// Total duration in seconds. For segmented plans this is
    /// `total_segments * segment_duration_sec`, never accumulated from
    /// provider durations.
    pub duration_sec: f64,
    /// Detected language (post-detection value; see language module).
    pub language: Option<String>,
    /// All segments across slices, timestamps shifted to the job timeline.
    pub segments: Vec<TranscriptSegment>,
    /// Number of planned audio slices (including failed ones).
    pub total_segments: usize,
    /// Fixed slice duration used for offset arithmetic, when segmented.
    pub segment_duration_sec: Option<f64>,
    /// Provider model that produced this transcript.
    pub model: String,
    /// Whether the correction pass ran successfully.
    pub processed: bool,
}

impl MergedTranscript {
    /// Slice index a merged segment belongs to, derived from its start
    /// offset. Only meaningful for segmented plans.
    pub fn slice_index(&self, segment: &TranscriptSegment) -> usize {
        match self.segment_duration_sec {
            Some(dur) if dur > 0.0 => (segment.start / dur).floor() as usize,
            _ => 0,
        }
    }
}

/// Format seconds as MM:SS, or HH:MM:SS past one hour.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
