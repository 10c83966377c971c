//! Time-slicing of oversize audio via ffmpeg's segment muxer.

use super::{ArtifactRole, AudioArtifact};
use crate::error::{OrdrettError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Pick the slice codec from the container extension. Everything not
/// natively AAC/Vorbis/PCM goes back through MP3.
fn codec_for_ext(ext: &str) -> (&'static str, &'static str) {
    match ext {
        "m4a" => ("aac", "m4a"),
        "ogg" | "oga" => ("libvorbis", "ogg"),
        "wav" => ("pcm_s16le", "wav"),
        _ => ("libmp3lame", "mp3"),
    }
}

/// Slice `source` into fixed-length segments under `segment_dir`.
///
/// Segments are named `segment_000.<ext>`, `segment_001.<ext>`, … with a
/// zero-padded index so lexicographic order equals time order.
#[instrument(skip_all, fields(source = %source.path.display()))]
pub async fn slice(
    source: &AudioArtifact,
    segment_dir: &Path,
    segment_duration_sec: u32,
    bitrate_kbps: u32,
) -> Result<Vec<AudioArtifact>> {
    tokio::fs::create_dir_all(segment_dir).await?;

    let (codec, ext) = codec_for_ext(&source.ext);
    let pattern = segment_dir.join(format!("segment_%03d.{}", ext));
    debug!(codec, ext, "Slicing audio into {}s segments", segment_duration_sec);

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-i")
        .arg(&source.path)
        .arg("-f")
        .arg("segment")
        .arg("-segment_time")
        .arg(segment_duration_sec.to_string())
        .arg("-reset_timestamps")
        .arg("1")
        .arg("-c:a")
        .arg(codec);
    if codec != "pcm_s16le" {
        cmd.arg("-b:a").arg(format!("{}k", bitrate_kbps));
    }
    cmd.arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg(&pattern)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match cmd.output().await {
        Ok(out) => out,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OrdrettError::ToolNotFound("ffmpeg".into()));
        }
        Err(e) => {
            return Err(OrdrettError::SegmentationFailed(format!(
                "ffmpeg error: {}",
                e
            )));
        }
    };

    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr);
        return Err(OrdrettError::SegmentationFailed(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            err.trim()
        )));
    }

    let artifacts = collect_segments(segment_dir, ext).await?;
    if artifacts.is_empty() {
        return Err(OrdrettError::SegmentationFailed(
            "ffmpeg produced no segments".into(),
        ));
    }

    info!(count = artifacts.len(), "Sliced audio into segments");
    Ok(artifacts)
}

/// Gather produced segment files in time order.
async fn collect_segments(segment_dir: &Path, ext: &str) -> Result<Vec<AudioArtifact>> {
    let mut names: Vec<String> = Vec::new();
    let mut entries = tokio::fs::read_dir(segment_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("segment_") && name.ends_with(&format!(".{}", ext)) {
            names.push(name);
        }
    }

    // Zero-padded indices make lexicographic order the time order.
    names.sort();

    let mut artifacts = Vec::with_capacity(names.len());
    for name in names {
        let artifact =
            AudioArtifact::from_path(segment_dir.join(name), ArtifactRole::Segment).await?;
        artifacts.push(artifact);
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_codec_for_ext() {
        assert_eq!(codec_for_ext("m4a"), ("aac", "m4a"));
        assert_eq!(codec_for_ext("ogg"), ("libvorbis", "ogg"));
        assert_eq!(codec_for_ext("wav"), ("pcm_s16le", "wav"));
        assert_eq!(codec_for_ext("mp3"), ("libmp3lame", "mp3"));
        assert_eq!(codec_for_ext("webm"), ("libmp3lame", "mp3"));
    }

    #[tokio::test]
    async fn test_collect_segments_sorted() {
        let dir = tempfile::tempdir().unwrap();
        // Created out of order on purpose.
        for idx in [2, 0, 1] {
            let path = dir.path().join(format!("segment_{:03}.mp3", idx));
            std::fs::File::create(&path)
                .unwrap()
                .write_all(b"x")
                .unwrap();
        }
        // Non-segment files are ignored.
        std::fs::File::create(dir.path().join("other.mp3")).unwrap();

        let artifacts = collect_segments(dir.path(), "mp3").await.unwrap();
        let names: Vec<_> = artifacts
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["segment_000.mp3", "segment_001.mp3", "segment_002.mp3"]
        );
        assert!(artifacts.iter().all(|a| a.role == ArtifactRole::Segment));
    }
}
