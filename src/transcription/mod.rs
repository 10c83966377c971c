//! Transcription module for Ordrett.
//!
//! Drives the external speech-to-text provider over a prepared [`Plan`]:
//! one request for single-file plans, a bounded worker pool with
//! per-segment retry for segmented plans, and a fixed-offset merge of
//! the per-segment results.
//!
//! [`Plan`]: crate::audio::Plan

pub mod merge;
mod models;
mod pool;
mod whisper;

pub use models::{
    format_timestamp, MergedTranscript, RawTranscript, TranscriptSegment, TranscriptWord,
};
pub use pool::{backoff_delay, transcribe_plan, SliceOutcome, SEGMENT_ATTEMPTS, SINGLE_FILE_ATTEMPTS};
pub use whisper::WhisperProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Worker pool width for segmented plans.
pub const CONCURRENT_LIMIT: usize = 3;

/// Hard cap on the provider prompt.
pub const MAX_PROMPT_CHARS: usize = 400;

/// What kind of audio is being transcribed; selects the prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Podcast,
    Interview,
    Lecture,
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "podcast" => Ok(ContentType::Podcast),
            "interview" => Ok(ContentType::Interview),
            "lecture" => Ok(ContentType::Lecture),
            _ => Err(format!(
                "Unknown content type: {}. Use podcast, interview, or lecture.",
                s
            )),
        }
    }
}

/// Per-request options handed to the provider.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// Provider model name.
    pub model: String,
    /// Explicit source language; `None` lets the provider detect.
    pub language: Option<String>,
    /// Context prompt, already capped at [`MAX_PROMPT_CHARS`].
    pub prompt: Option<String>,
}

/// Assemble the provider prompt from content type, language, and user
/// keywords. Keywords come first and win the 400-character cap.
pub fn build_prompt(content_type: ContentType, language: Option<&str>, keywords: &str) -> String {
    let chinese = matches!(language, Some(lang) if lang.starts_with("zh"));
    let base = match (content_type, chinese) {
        (ContentType::Podcast, false) => {
            "This is a podcast episode. Transcribe accurately with proper punctuation."
        }
        (ContentType::Podcast, true) => "这是一段播客节目，请准确转写并添加标点。",
        (ContentType::Interview, false) => {
            "This is an interview with multiple speakers. Transcribe accurately with proper punctuation."
        }
        (ContentType::Interview, true) => "这是一段多人访谈，请准确转写并添加标点。",
        (ContentType::Lecture, false) => {
            "This is a lecture. Transcribe accurately, keeping technical terms intact."
        }
        (ContentType::Lecture, true) => "这是一段讲座，请准确转写并保留专业术语。",
    };

    let mut prompt = String::new();
    let keywords = keywords.trim();
    if !keywords.is_empty() {
        prompt.push_str(keywords);
        prompt.push_str(". ");
    }
    prompt.push_str(base);

    if prompt.chars().count() > MAX_PROMPT_CHARS {
        prompt = prompt.chars().take(MAX_PROMPT_CHARS).collect();
    }
    prompt
}

/// How a provider failure should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// HTTP 429.
    RateLimited,
    /// HTTP 402 or an explicit quota/billing rejection.
    QuotaExhausted,
    /// HTTP 401.
    AuthInvalid,
    /// HTTP 403.
    Forbidden,
    /// Connection reset; may be the provider shedding load near quota.
    ConnectionReset,
    /// Any other transport-level failure.
    Transport,
    /// The provider rejected the request shape.
    InvalidRequest,
    /// Non-retryable provider-side error.
    Fatal,
}

/// Error from a speech-to-text provider call.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether another attempt is worth making.
    pub fn retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimited
                | ProviderErrorKind::ConnectionReset
                | ProviderErrorKind::Transport
        )
    }

    /// Base backoff delay for this failure class.
    pub fn backoff_base(&self) -> Duration {
        match self.kind {
            ProviderErrorKind::RateLimited | ProviderErrorKind::ConnectionReset => {
                Duration::from_secs(5)
            }
            _ => Duration::from_secs(2),
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl From<ProviderError> for crate::error::OrdrettError {
    fn from(err: ProviderError) -> Self {
        use crate::error::OrdrettError;
        match err.kind {
            ProviderErrorKind::RateLimited => OrdrettError::ProviderRateLimited(err.message),
            ProviderErrorKind::QuotaExhausted => OrdrettError::ProviderQuotaExhausted(err.message),
            ProviderErrorKind::AuthInvalid => OrdrettError::ProviderAuthFailed(err.message),
            ProviderErrorKind::Forbidden => OrdrettError::ProviderAuthFailed(err.message),
            ProviderErrorKind::InvalidRequest => OrdrettError::ProviderRequestInvalid(err.message),
            ProviderErrorKind::ConnectionReset
            | ProviderErrorKind::Transport
            | ProviderErrorKind::Fatal => OrdrettError::ProviderTransientFailed(err.message),
        }
    }
}

/// Trait for speech-to-text providers.
///
/// Implementations must read the audio file on every call so each retry
/// gets a fresh input stream.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe one audio file and return the raw provider response.
    async fn transcribe(
        &self,
        audio: &Path,
        opts: &TranscribeOptions,
    ) -> std::result::Result<RawTranscript, ProviderError>;
}
