//! Size-adaptive audio preparation.
//!
//! Decides how a validated audio file is presented to the transcription
//! provider: unchanged, transcoded, or transcoded and sliced into
//! fixed-length segments.

pub mod segment;
pub mod transcode;

use crate::config::PrepareSettings;
use crate::error::Result;
use crate::validate;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Hard cap the provider enforces on a single request's audio payload.
pub const PROVIDER_LIMIT_BYTES: u64 = 25 * 1024 * 1024;

/// Default slice length. The merger's offset arithmetic depends on the
/// configured value being declared up front, never a per-segment
/// measurement; the plan carries whatever value was used.
pub const SEGMENT_DURATION_SEC: u32 = 300;

/// Where an artifact came from in the preparation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
    Original,
    Transcoded,
    Segment,
}

/// A file on disk owned by a job.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub ext: String,
    pub role: ArtifactRole,
}

impl AudioArtifact {
    /// Build an artifact from an existing file.
    pub async fn from_path(path: PathBuf, role: ArtifactRole) -> Result<Self> {
        let size_bytes = tokio::fs::metadata(&path).await?.len();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        Ok(Self {
            path,
            size_bytes,
            ext,
            role,
        })
    }
}

/// The preparer's decision on how audio goes to the provider.
#[derive(Debug, Clone)]
pub enum Plan {
    /// One request for the whole file.
    Single(AudioArtifact),
    /// Ordered fixed-length slices, one request each.
    Segmented {
        artifacts: Vec<AudioArtifact>,
        segment_duration_sec: u32,
    },
}

impl Plan {
    /// Number of provider requests this plan will issue.
    pub fn request_count(&self) -> usize {
        match self {
            Plan::Single(_) => 1,
            Plan::Segmented { artifacts, .. } => artifacts.len(),
        }
    }
}

/// Prepare a validated original for transcription.
///
/// Small files pass through untouched. Oversize files are transcoded to
/// a low-bitrate mono rendition; if that is still over the provider
/// limit, the transcoded file is sliced into fixed-length segments.
/// Every produced artifact is re-validated before being returned.
#[instrument(skip(original, work_dir, opts), fields(size = original.size_bytes))]
pub async fn prepare(
    original: AudioArtifact,
    work_dir: &Path,
    opts: &PrepareSettings,
) -> Result<Plan> {
    if original.size_bytes <= PROVIDER_LIMIT_BYTES {
        info!("Audio fits provider limit, using single-file plan");
        return Ok(Plan::Single(original));
    }

    info!(
        size = original.size_bytes,
        limit = PROVIDER_LIMIT_BYTES,
        "Audio exceeds provider limit, transcoding"
    );
    let transcoded = transcode::compress(&original.path, work_dir, opts.audio_bitrate_kbps).await?;
    validate::validate(&transcoded.path).await?;

    if transcoded.size_bytes <= PROVIDER_LIMIT_BYTES {
        info!(
            size = transcoded.size_bytes,
            "Transcoded audio fits provider limit"
        );
        return Ok(Plan::Single(transcoded));
    }

    info!(
        size = transcoded.size_bytes,
        "Transcoded audio still oversize, slicing into {}s segments", opts.segment_duration_sec
    );
    let segment_dir = work_dir.join("segments");
    let artifacts = segment::slice(
        &transcoded,
        &segment_dir,
        opts.segment_duration_sec,
        opts.audio_bitrate_kbps,
    )
    .await?;
    for artifact in &artifacts {
        validate::validate(&artifact.path).await?;
    }

    Ok(Plan::Segmented {
        artifacts,
        segment_duration_sec: opts.segment_duration_sec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_mp3(path: &Path, len: usize) {
        let mut contents = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
        contents.resize(len, 0);
        std::fs::File::create(path)
            .unwrap()
            .write_all(&contents)
            .unwrap();
    }

    #[tokio::test]
    async fn test_small_file_single_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.mp3");
        write_mp3(&path, 4096);

        let artifact = AudioArtifact::from_path(path, ArtifactRole::Original)
            .await
            .unwrap();
        let plan = prepare(artifact, dir.path(), &PrepareSettings::default())
            .await
            .unwrap();

        match plan {
            Plan::Single(a) => {
                assert_eq!(a.role, ArtifactRole::Original);
                assert_eq!(a.ext, "mp3");
            }
            Plan::Segmented { .. } => panic!("expected single plan"),
        }
    }

    #[tokio::test]
    async fn test_artifact_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.M4A");
        write_mp3(&path, 2048);

        let artifact = AudioArtifact::from_path(path, ArtifactRole::Original)
            .await
            .unwrap();
        assert_eq!(artifact.ext, "m4a");
        assert_eq!(artifact.size_bytes, 2048);
    }

    #[test]
    fn test_plan_request_count() {
        let artifact = AudioArtifact {
            path: PathBuf::from("/tmp/a.mp3"),
            size_bytes: 1,
            ext: "mp3".to_string(),
            role: ArtifactRole::Segment,
        };
        let plan = Plan::Segmented {
            artifacts: vec![artifact.clone(), artifact.clone(), artifact],
            segment_duration_sec: SEGMENT_DURATION_SEC,
        };
        assert_eq!(plan.request_count(), 3);
    }
}
