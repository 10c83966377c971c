//! Compression transcode via ffmpeg.
//!
//! Target rendition is mono, 16 kHz, ~48 kbit/s. Speech survives this
//! fine and it shrinks most podcast files under the provider limit.

use super::{ArtifactRole, AudioArtifact};
use crate::error::{OrdrettError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Codec cascade, tried in order. Builds of ffmpeg differ in which
/// encoders they ship, so the first one that succeeds wins.
const CODEC_CASCADE: &[(&str, &str)] = &[
    ("libmp3lame", "mp3"),
    ("mp3", "mp3"),
    ("aac", "m4a"),
    ("libvorbis", "ogg"),
    ("pcm_s16le", "wav"),
];

/// Transcode `source` into a low-bitrate mono rendition in `work_dir`.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn compress(source: &Path, work_dir: &Path, bitrate_kbps: u32) -> Result<AudioArtifact> {
    let mut failures: Vec<String> = Vec::new();

    for &(codec, ext) in CODEC_CASCADE {
        let dest = work_dir.join(format!("transcoded.{}", ext));
        debug!(codec, ext, "Attempting transcode");

        match run_ffmpeg(source, &dest, codec, bitrate_kbps).await {
            Ok(()) => {
                debug!(codec, dest = %dest.display(), "Transcode succeeded");
                return AudioArtifact::from_path(dest, ArtifactRole::Transcoded).await;
            }
            Err(OrdrettError::ToolNotFound(tool)) => {
                return Err(OrdrettError::TranscoderUnavailable(format!(
                    "{} is not installed",
                    tool
                )));
            }
            Err(e) => {
                warn!(codec, "Transcode attempt failed: {}", e);
                failures.push(format!("{}: {}", codec, e));
                let _ = tokio::fs::remove_file(&dest).await;
            }
        }
    }

    Err(OrdrettError::TranscoderUnavailable(format!(
        "all codecs failed ({})",
        failures.join("; ")
    )))
}

/// Run one ffmpeg compression attempt.
async fn run_ffmpeg(source: &Path, dest: &Path, codec: &str, bitrate_kbps: u32) -> Result<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-i")
        .arg(source)
        .arg("-vn")
        .arg("-ac")
        .arg("1")
        .arg("-ar")
        .arg("16000")
        .arg("-b:a")
        .arg(format!("{}k", bitrate_kbps))
        .arg("-c:a")
        .arg(codec)
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let result = cmd.output().await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(OrdrettError::TranscoderUnavailable(format!(
                "ffmpeg exited with {}: {}",
                out.status,
                err.trim()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(OrdrettError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(OrdrettError::TranscoderUnavailable(format!(
            "ffmpeg error: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_order_prefers_mp3() {
        assert_eq!(CODEC_CASCADE[0], ("libmp3lame", "mp3"));
        // PCM last: it always works but rarely shrinks anything.
        assert_eq!(CODEC_CASCADE[CODEC_CASCADE.len() - 1], ("pcm_s16le", "wav"));
    }
}
