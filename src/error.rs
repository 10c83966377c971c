//! Error types for Ordrett.

use serde::Serialize;
use thiserror::Error;

/// Library-level error type for Ordrett operations.
#[derive(Error, Debug)]
pub enum OrdrettError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upload too large: {observed} bytes (limit {limit} bytes)")]
    UploadTooLarge { observed: u64, limit: u64 },

    #[error("Audio fetch failed: {0}")]
    FetchFailed(String),

    #[error("HTTP error fetching audio: status {0}")]
    FetchStatus(u16),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(u32),

    #[error("Audio payload too small: {0} bytes")]
    InvalidPayload(u64),

    #[error("Audio file is empty")]
    EmptyFile,

    #[error("Audio file is truncated: {0} bytes")]
    TruncatedFile(u64),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Transcoder unavailable: {0}")]
    TranscoderUnavailable(String),

    #[error("Audio segmentation failed: {0}")]
    SegmentationFailed(String),

    #[error("Provider rate limited: {0}")]
    ProviderRateLimited(String),

    #[error("Provider quota exhausted: {0}")]
    ProviderQuotaExhausted(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rejected request: {0}")]
    ProviderRequestInvalid(String),

    #[error("Provider request failed: {0}")]
    ProviderTransientFailed(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Job deadline exceeded")]
    Timeout,

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Ordrett operations.
pub type Result<T> = std::result::Result<T, OrdrettError>;

/// Stable user-facing error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorClass {
    InvalidInput,
    FetchFailed,
    PrepareFailed,
    ProviderRateLimited,
    ProviderQuotaExhausted,
    ProviderAuthFailed,
    ProviderRequestInvalid,
    ProviderTransientFailed,
    Cancelled,
    Timeout,
    Internal,
}

/// User-visible error surface: stable class, message, and actionable hints.
#[derive(Debug, Clone, Serialize)]
pub struct UserError {
    pub class: ErrorClass,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl OrdrettError {
    /// Map this error onto its stable user-facing class.
    pub fn class(&self) -> ErrorClass {
        match self {
            OrdrettError::Config(_)
            | OrdrettError::InvalidInput(_)
            | OrdrettError::UploadTooLarge { .. }
            | OrdrettError::EmptyFile
            | OrdrettError::TruncatedFile(_)
            | OrdrettError::UnsupportedFormat(_) => ErrorClass::InvalidInput,

            OrdrettError::FetchFailed(_)
            | OrdrettError::FetchStatus(_)
            | OrdrettError::TooManyRedirects(_)
            | OrdrettError::InvalidPayload(_)
            | OrdrettError::Http(_) => ErrorClass::FetchFailed,

            OrdrettError::TranscoderUnavailable(_)
            | OrdrettError::SegmentationFailed(_)
            | OrdrettError::ToolNotFound(_) => ErrorClass::PrepareFailed,

            OrdrettError::ProviderRateLimited(_) => ErrorClass::ProviderRateLimited,
            OrdrettError::ProviderQuotaExhausted(_) => ErrorClass::ProviderQuotaExhausted,
            OrdrettError::ProviderAuthFailed(_) => ErrorClass::ProviderAuthFailed,
            OrdrettError::ProviderRequestInvalid(_) => ErrorClass::ProviderRequestInvalid,
            OrdrettError::ProviderTransientFailed(_) => ErrorClass::ProviderTransientFailed,

            OrdrettError::Cancelled => ErrorClass::Cancelled,
            OrdrettError::Timeout => ErrorClass::Timeout,

            OrdrettError::Io(_)
            | OrdrettError::Json(_)
            | OrdrettError::TomlParse(_)
            | OrdrettError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Actionable hints surfaced alongside the error message.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            OrdrettError::UploadTooLarge { observed, limit } => vec![
                format!(
                    "The uploaded file is {:.1} MiB but the limit is {:.1} MiB",
                    *observed as f64 / (1024.0 * 1024.0),
                    *limit as f64 / (1024.0 * 1024.0)
                ),
                "Compress the audio before uploading (e.g. ffmpeg -ac 1 -ar 16000 -b:a 48k)"
                    .to_string(),
                "Trim silence or split the recording into shorter episodes".to_string(),
            ],
            OrdrettError::TranscoderUnavailable(_) => vec![
                "Install ffmpeg and ensure it is on your PATH".to_string(),
                "Alternatively, compress the audio manually to under 25 MiB (mono, 16 kHz, \
                 48 kbit/s is usually enough)"
                    .to_string(),
            ],
            OrdrettError::ProviderQuotaExhausted(_) => vec![
                "Check your provider account usage and billing status".to_string(),
                "Top up credits or wait for the quota window to reset".to_string(),
            ],
            OrdrettError::ProviderRateLimited(_) => vec![
                "The provider is rate limiting requests; retry in a few minutes".to_string(),
            ],
            OrdrettError::ProviderAuthFailed(_) => {
                vec!["Verify that OPENAI_API_KEY is set and valid".to_string()]
            }
            OrdrettError::UnsupportedFormat(_) => vec![
                "Supported formats: flac, m4a, mp3, mp4, mpeg, mpga, oga, ogg, wav, webm"
                    .to_string(),
            ],
            _ => Vec::new(),
        }
    }

    /// Build the `{class, message, suggestions}` surface returned to callers.
    pub fn to_user_error(&self) -> UserError {
        UserError {
            class: self.class(),
            message: self.to_string(),
            suggestions: self.suggestions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(OrdrettError::EmptyFile.class(), ErrorClass::InvalidInput);
        assert_eq!(
            OrdrettError::TooManyRedirects(5).class(),
            ErrorClass::FetchFailed
        );
        assert_eq!(
            OrdrettError::ProviderQuotaExhausted("402".into()).class(),
            ErrorClass::ProviderQuotaExhausted
        );
        assert_eq!(OrdrettError::Cancelled.class(), ErrorClass::Cancelled);
    }

    #[test]
    fn test_upload_too_large_suggestions_include_sizes() {
        let err = OrdrettError::UploadTooLarge {
            observed: 40 * 1024 * 1024,
            limit: 32 * 1024 * 1024,
        };
        let user = err.to_user_error();
        assert_eq!(user.class, ErrorClass::InvalidInput);
        assert!(user.suggestions[0].contains("40.0 MiB"));
        assert!(user.suggestions[0].contains("32.0 MiB"));
    }

    #[test]
    fn test_quota_suggestions_point_at_usage() {
        let err = OrdrettError::ProviderQuotaExhausted("insufficient_quota".into());
        assert!(err.suggestions().iter().any(|s| s.contains("usage")));
    }
}
