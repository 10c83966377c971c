//! Audio file validation: extension allow-list and container signatures.

use crate::error::{OrdrettError, Result};
use std::path::Path;
use tracing::{debug, warn};

/// File extensions the transcription provider accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    "flac", "m4a", "mp3", "mp4", "mpeg", "mpga", "oga", "ogg", "wav", "webm",
];

/// Minimum plausible size for a real audio file, in bytes.
const MIN_AUDIO_BYTES: u64 = 1000;

/// Number of leading bytes inspected for a container signature.
const SNIFF_LEN: usize = 12;

/// Container formats recognized by signature sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSignature {
    Mp3,
    Wav,
    Mp4,
    Ogg,
    Flac,
    Unknown,
}

/// Check whether an extension (lowercase, without dot) is accepted.
pub fn is_accepted_extension(ext: &str) -> bool {
    ACCEPTED_EXTENSIONS.contains(&ext)
}

/// Inspect the first bytes of a file and identify its container.
pub fn sniff_signature(header: &[u8]) -> AudioSignature {
    if header.len() >= 3 && &header[..3] == b"ID3" {
        return AudioSignature::Mp3;
    }
    // Bare MP3 frame sync without an ID3 tag.
    if header.len() >= 2
        && header[0] == 0xFF
        && matches!(header[1], 0xFB | 0xF3 | 0xF2)
    {
        return AudioSignature::Mp3;
    }
    if header.len() >= 12 && &header[..4] == b"RIFF" && &header[8..12] == b"WAVE" {
        return AudioSignature::Wav;
    }
    // The ftyp box is preceded by a 4-byte size, so search the window.
    if header.len() >= 8 && header.windows(4).any(|w| w == b"ftyp") {
        return AudioSignature::Mp4;
    }
    if header.len() >= 4 && &header[..4] == b"OggS" {
        return AudioSignature::Ogg;
    }
    if header.len() >= 4 && &header[..4] == b"fLaC" {
        return AudioSignature::Flac;
    }
    AudioSignature::Unknown
}

/// Validate an audio file on disk: size sanity, extension allow-list,
/// container signature. Unknown signatures with an accepted extension
/// pass with a warning, since some encoders emit unusual headers.
pub async fn validate(path: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(path).await?;
    let size = metadata.len();

    if size == 0 {
        return Err(OrdrettError::EmptyFile);
    }
    if size < MIN_AUDIO_BYTES {
        return Err(OrdrettError::TruncatedFile(size));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !is_accepted_extension(&ext) {
        return Err(OrdrettError::UnsupportedFormat(ext));
    }

    let header = read_header(path).await?;
    let signature = sniff_signature(&header);

    if signature == AudioSignature::Unknown {
        warn!(
            path = %path.display(),
            ext = %ext,
            "Unrecognized container signature, accepting based on extension"
        );
    } else {
        debug!(path = %path.display(), ?signature, "Validated audio container");
    }

    Ok(())
}

/// Read up to the sniff window from the start of the file.
async fn read_header(path: &Path) -> Result<Vec<u8>> {
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; SNIFF_LEN];
    let mut read = 0;
    while read < SNIFF_LEN {
        let n = file.read(&mut buf[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
    }
    buf.truncate(read);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_accepted_extensions() {
        assert!(is_accepted_extension("mp3"));
        assert!(is_accepted_extension("webm"));
        assert!(!is_accepted_extension("aiff"));
        assert!(!is_accepted_extension("MP3")); // caller lowercases first
    }

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(sniff_signature(b"ID3\x04\x00\x00\x00\x00\x00\x00"), AudioSignature::Mp3);
        assert_eq!(sniff_signature(&[0xFF, 0xFB, 0x90, 0x00]), AudioSignature::Mp3);
        assert_eq!(sniff_signature(&[0xFF, 0xF3, 0x90, 0x00]), AudioSignature::Mp3);
        assert_eq!(sniff_signature(b"RIFF\x24\x08\x00\x00WAVEfmt "), AudioSignature::Wav);
        assert_eq!(sniff_signature(b"\x00\x00\x00\x20ftypM4A "), AudioSignature::Mp4);
        assert_eq!(sniff_signature(b"OggS\x00\x02\x00\x00"), AudioSignature::Ogg);
        assert_eq!(sniff_signature(b"fLaC\x00\x00\x00\x22"), AudioSignature::Flac);
        assert_eq!(sniff_signature(b"GARBAGE_HEADER"), AudioSignature::Unknown);
        assert_eq!(sniff_signature(b""), AudioSignature::Unknown);
    }

    #[tokio::test]
    async fn test_validate_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mp3");
        std::fs::File::create(&path).unwrap();

        let err = validate(&path).await.unwrap_err();
        assert!(matches!(err, OrdrettError::EmptyFile));
    }

    #[tokio::test]
    async fn test_validate_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.mp3");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"ID3 tiny")
            .unwrap();

        let err = validate(&path).await.unwrap_err();
        assert!(matches!(err, OrdrettError::TruncatedFile(8)));
    }

    #[tokio::test]
    async fn test_validate_bad_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.xyz");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&vec![0u8; 2000]).unwrap();

        let err = validate(&path).await.unwrap_err();
        assert!(matches!(err, OrdrettError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_validate_good_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.mp3");
        let mut file = std::fs::File::create(&path).unwrap();
        let mut contents = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
        contents.resize(4096, 0);
        file.write_all(&contents).unwrap();

        assert!(validate(&path).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_unknown_signature_known_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.mp3");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&vec![0x42u8; 2000]).unwrap();

        // Accepted with a warning.
        assert!(validate(&path).await.is_ok());
    }
}
