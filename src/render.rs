//! Transcript rendering (TXT, SRT, WebVTT, JSON).
//!
//! Rendering is pure: every format derives from the same
//! [`MergedTranscript`] and no I/O happens here. SRT and VTT follow the
//! standard timestamp grammar byte-for-byte.

use crate::error::Result;
use crate::transcription::{format_timestamp, MergedTranscript, TranscriptWord};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputFormat {
    Txt,
    Srt,
    Vtt,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Txt),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" | "webvtt" => Ok(OutputFormat::Vtt),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use txt, srt, vtt, or json.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
            OutputFormat::Json => "json",
        };
        write!(f, "{}", name)
    }
}

/// Rendered output per requested format.
pub type RenderedFormats = BTreeMap<OutputFormat, String>;

/// Render every requested format. A failure in one format is logged
/// and does not prevent the others.
pub fn render_all(transcript: &MergedTranscript, formats: &[OutputFormat]) -> RenderedFormats {
    let mut rendered = RenderedFormats::new();
    for format in formats {
        match render(transcript, *format) {
            Ok(content) => {
                rendered.insert(*format, content);
            }
            Err(e) => {
                warn!(format = %format, "Rendering failed: {}", e);
            }
        }
    }
    rendered
}

/// Render one format.
pub fn render(transcript: &MergedTranscript, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Txt => render_txt(transcript),
        OutputFormat::Srt => render_srt(transcript),
        OutputFormat::Vtt => render_vtt(transcript),
        OutputFormat::Json => render_json(transcript)?,
    })
}

/// Plain text: `[MM:SS - MM:SS] text` blocks separated by blank lines,
/// with a slice divider before each slice's block on multi-slice jobs.
fn render_txt(transcript: &MergedTranscript) -> String {
    if transcript.segments.is_empty() {
        return transcript.text.clone();
    }

    let line = |segment: &crate::transcription::TranscriptSegment| {
        format!(
            "[{} - {}] {}",
            format_timestamp(segment.start),
            format_timestamp(segment.end),
            segment.text
        )
    };

    if transcript.total_segments > 1 {
        let mut blocks: Vec<String> = Vec::new();
        let mut current_slice: Option<usize> = None;
        let mut current_lines: Vec<String> = Vec::new();

        for segment in &transcript.segments {
            let slice = transcript.slice_index(segment);
            if current_slice != Some(slice) {
                if let Some(index) = current_slice {
                    blocks.push(format!(
                        "=== 片段 {} ===\n{}",
                        index + 1,
                        current_lines.join("\n\n")
                    ));
                    current_lines.clear();
                }
                current_slice = Some(slice);
            }
            current_lines.push(line(segment));
        }
        if let Some(index) = current_slice {
            blocks.push(format!(
                "=== 片段 {} ===\n{}",
                index + 1,
                current_lines.join("\n\n")
            ));
        }
        blocks.join("\n\n")
    } else {
        transcript
            .segments
            .iter()
            .map(line)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// SubRip: 1-based cue index, comma millisecond separator.
fn render_srt(transcript: &MergedTranscript) -> String {
    let mut output = String::new();
    for (i, segment) in transcript.segments.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(segment.start),
            format_srt_timestamp(segment.end)
        ));
        output.push_str(&segment.text);
        output.push_str("\n\n");
    }
    output
}

/// WebVTT: header plus cues without indices, dot millisecond separator.
fn render_vtt(transcript: &MergedTranscript) -> String {
    let mut output = String::from("WEBVTT\n\n");
    for segment in &transcript.segments {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_timestamp(segment.start),
            format_vtt_timestamp(segment.end)
        ));
        output.push_str(&segment.text);
        output.push_str("\n\n");
    }
    output
}

#[derive(Serialize)]
struct JsonTranscript<'a> {
    text: &'a str,
    language: Option<&'a str>,
    duration: f64,
    segments: Vec<JsonSegment<'a>>,
    metadata: JsonMetadata<'a>,
}

#[derive(Serialize)]
struct JsonSegment<'a> {
    id: String,
    text: &'a str,
    start: f64,
    end: f64,
    words: &'a [TranscriptWord],
    #[serde(skip_serializing_if = "Option::is_none")]
    speaker: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMetadata<'a> {
    model: &'a str,
    timestamp: String,
    processed: bool,
    total_segments: usize,
}

/// Structured JSON, pretty-printed with 2-space indent. Segment ids are
/// generated at render time.
fn render_json(transcript: &MergedTranscript) -> Result<String> {
    let export = JsonTranscript {
        text: &transcript.text,
        language: transcript.language.as_deref(),
        duration: transcript.duration_sec,
        segments: transcript
            .segments
            .iter()
            .map(|s| JsonSegment {
                id: Uuid::new_v4().to_string(),
                text: &s.text,
                start: s.start,
                end: s.end,
                words: &s.words,
                speaker: s.speaker.as_deref(),
            })
            .collect(),
        metadata: JsonMetadata {
            model: &transcript.model,
            timestamp: chrono::Utc::now().to_rfc3339(),
            processed: transcript.processed,
            total_segments: transcript.total_segments,
        },
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Format timestamp for SRT (`00:00:00,000`). Milliseconds floored.
fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, ms)
}

/// Format timestamp for WebVTT (`00:00:00.000`). Milliseconds floored.
fn format_vtt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::TranscriptSegment;

    fn single_transcript() -> MergedTranscript {
        MergedTranscript {
            text: "hello world bye".to_string(),
            duration_sec: 7.0,
            language: Some("en".to_string()),
            segments: vec![
                TranscriptSegment::new(0.0, 2.0, "hello".to_string()),
                TranscriptSegment::new(2.0, 5.0, "world".to_string()),
                TranscriptSegment::new(5.0, 7.0, "bye".to_string()),
            ],
            total_segments: 1,
            segment_duration_sec: None,
            model: "whisper-1".to_string(),
            processed: false,
        }
    }

    fn segmented_transcript() -> MergedTranscript {
        MergedTranscript {
            text: "=== 片段 1 ===\nA\n\n=== 片段 2 ===\nB".to_string(),
            duration_sec: 600.0,
            language: Some("en".to_string()),
            segments: vec![
                TranscriptSegment::new(0.0, 10.0, "A".to_string()),
                TranscriptSegment::new(300.0, 312.0, "B".to_string()),
            ],
            total_segments: 2,
            segment_duration_sec: Some(300.0),
            model: "whisper-1".to_string(),
            processed: false,
        }
    }

    #[test]
    fn test_txt_single() {
        let txt = render(&single_transcript(), OutputFormat::Txt).unwrap();
        assert_eq!(
            txt,
            "[00:00 - 00:02] hello\n\n[00:02 - 00:05] world\n\n[00:05 - 00:07] bye"
        );
    }

    #[test]
    fn test_txt_multi_slice_dividers() {
        let txt = render(&segmented_transcript(), OutputFormat::Txt).unwrap();
        assert_eq!(
            txt,
            "=== 片段 1 ===\n[00:00 - 00:10] A\n\n=== 片段 2 ===\n[05:00 - 05:12] B"
        );
    }

    #[test]
    fn test_txt_falls_back_to_raw_text() {
        let mut transcript = single_transcript();
        transcript.segments.clear();
        let txt = render(&transcript, OutputFormat::Txt).unwrap();
        assert_eq!(txt, "hello world bye");
    }

    #[test]
    fn test_srt_segmented() {
        let srt = render(&segmented_transcript(), OutputFormat::Srt).unwrap();
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:10,000\nA\n\n2\n00:05:00,000 --> 00:05:12,000\nB\n\n"
        );
    }

    #[test]
    fn test_vtt_header_and_cues() {
        let vtt = render(&segmented_transcript(), OutputFormat::Vtt).unwrap();
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:10.000\nA\n\n"));
        assert!(vtt.contains("00:05:00.000 --> 00:05:12.000\nB\n\n"));
        // No cue indices and no dividers in VTT.
        assert!(!vtt.contains("片段"));
    }

    #[test]
    fn test_json_shape() {
        let json = render(&segmented_transcript(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["duration"], 600.0);
        assert_eq!(value["language"], "en");
        assert_eq!(value["segments"].as_array().unwrap().len(), 2);
        assert!(value["segments"][0]["id"].is_string());
        assert_eq!(value["metadata"]["model"], "whisper-1");
        assert_eq!(value["metadata"]["totalSegments"], 2);
        assert_eq!(value["metadata"]["processed"], false);
        // Pretty-printed with 2-space indent.
        assert!(json.contains("\n  \"text\""));
    }

    #[test]
    fn test_render_all_subset() {
        let rendered = render_all(
            &single_transcript(),
            &[OutputFormat::Txt, OutputFormat::Srt],
        );
        assert_eq!(rendered.len(), 2);
        assert!(rendered.contains_key(&OutputFormat::Txt));
        assert!(!rendered.contains_key(&OutputFormat::Vtt));
    }

    #[test]
    fn test_rendering_idempotent() {
        let transcript = segmented_transcript();
        for format in [OutputFormat::Txt, OutputFormat::Srt, OutputFormat::Vtt] {
            let a = render(&transcript, format).unwrap();
            let b = render(&transcript, format).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_srt_timestamp_floors_milliseconds() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(61.5), "00:01:01,500");
        assert_eq!(format_srt_timestamp(3661.1239), "01:01:01,123");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Txt);
        assert_eq!("webvtt".parse::<OutputFormat>().unwrap(), OutputFormat::Vtt);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("docx".parse::<OutputFormat>().is_err());
    }

    /// SRT round-trip: parse back to (start, end, text) triples.
    #[test]
    fn test_srt_round_trip() {
        let transcript = segmented_transcript();
        let srt = render(&transcript, OutputFormat::Srt).unwrap();

        let mut parsed: Vec<(f64, f64, String)> = Vec::new();
        for block in srt.split("\n\n").filter(|b| !b.is_empty()) {
            let mut lines = block.lines();
            let _index = lines.next().unwrap();
            let times = lines.next().unwrap();
            let (start, end) = times.split_once(" --> ").unwrap();
            let text = lines.collect::<Vec<_>>().join("\n");
            parsed.push((parse_ts(start, ','), parse_ts(end, ','), text));
        }

        let expected: Vec<(f64, f64, String)> = transcript
            .segments
            .iter()
            .map(|s| (s.start, s.end, s.text.clone()))
            .collect();
        assert_eq!(parsed, expected);
    }

    fn parse_ts(s: &str, ms_sep: char) -> f64 {
        let (hms, ms) = s.rsplit_once(ms_sep).unwrap();
        let parts: Vec<u64> = hms.split(':').map(|p| p.parse().unwrap()).collect();
        (parts[0] * 3600 + parts[1] * 60 + parts[2]) as f64 + ms.parse::<u64>().unwrap() as f64 / 1000.0
    }
}
