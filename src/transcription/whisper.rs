//! OpenAI Whisper speech-to-text provider.

use super::{
    ProviderError, ProviderErrorKind, RawTranscript, SpeechToText, TranscribeOptions,
    TranscriptSegment, TranscriptWord,
};
use crate::openai::create_client;
use async_openai::error::OpenAIError;
use async_openai::types::{
    AudioResponseFormat, CreateTranscriptionRequestArgs, CreateTranscriptionResponseVerboseJson,
    TimestampGranularity,
};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// Whisper-backed implementation of [`SpeechToText`].
pub struct WhisperProvider {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
}

impl WhisperProvider {
    pub fn new() -> Self {
        Self {
            client: create_client(),
        }
    }
}

impl Default for WhisperProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechToText for WhisperProvider {
    #[instrument(skip(self, opts), fields(audio = %audio.display(), model = %opts.model))]
    async fn transcribe(
        &self,
        audio: &Path,
        opts: &TranscribeOptions,
    ) -> std::result::Result<RawTranscript, ProviderError> {
        // Read per call: each retry must get a fresh input stream.
        let file_bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Fatal, format!("read audio: {}", e)))?;

        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(async_openai::types::AudioInput::from_vec_u8(
                file_name, file_bytes,
            ))
            .model(&opts.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .timestamp_granularities(vec![TimestampGranularity::Word]);

        if let Some(lang) = &opts.language {
            request_builder.language(lang);
        }
        if let Some(prompt) = &opts.prompt {
            request_builder.prompt(prompt);
        }

        let request = request_builder.build().map_err(|e| {
            ProviderError::new(ProviderErrorKind::InvalidRequest, format!("build request: {}", e))
        })?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(map_openai_error)?;

        debug!("Provider returned {:.1}s of audio", response.duration);
        Ok(parse_response(response))
    }
}

/// Convert the provider's verbose JSON response into a [`RawTranscript`],
/// attaching word timestamps to the segment they fall into.
fn parse_response(response: CreateTranscriptionResponseVerboseJson) -> RawTranscript {
    let duration = response.duration as f64;
    let text = response.text.trim().to_string();
    let language = if response.language.is_empty() {
        None
    } else {
        Some(response.language.clone())
    };

    let words: Vec<TranscriptWord> = response
        .words
        .unwrap_or_default()
        .into_iter()
        .map(|w| TranscriptWord {
            word: w.word,
            start: w.start as f64,
            end: w.end as f64,
        })
        .collect();

    let segments: Vec<TranscriptSegment> = match response.segments {
        Some(segments) if !segments.is_empty() => segments
            .into_iter()
            .map(|s| {
                let start = s.start as f64;
                let end = s.end as f64;
                let segment_words = words
                    .iter()
                    .filter(|w| w.start >= start && w.start < end)
                    .cloned()
                    .collect();
                TranscriptSegment {
                    start,
                    end,
                    text: s.text.trim().to_string(),
                    words: segment_words,
                    speaker: None,
                }
            })
            .collect(),
        // The provider sometimes omits segments entirely; fall back to
        // one whole-file segment so downstream stages still work.
        _ => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![TranscriptSegment {
                    start: 0.0,
                    end: duration,
                    text: text.clone(),
                    words: words.clone(),
                    speaker: None,
                }]
            }
        }
    };

    RawTranscript {
        text,
        duration_sec: duration,
        language,
        segments,
    }
}

/// Classify an SDK error into the retry taxonomy.
fn map_openai_error(err: OpenAIError) -> ProviderError {
    match err {
        OpenAIError::Reqwest(e) => {
            let message = e.to_string();
            let kind = match e.status().map(|s| s.as_u16()) {
                Some(429) => ProviderErrorKind::RateLimited,
                Some(402) => ProviderErrorKind::QuotaExhausted,
                Some(401) => ProviderErrorKind::AuthInvalid,
                Some(403) => ProviderErrorKind::Forbidden,
                _ if message.contains("reset") => ProviderErrorKind::ConnectionReset,
                _ => ProviderErrorKind::Transport,
            };
            ProviderError::new(kind, message)
        }
        OpenAIError::ApiError(api) => {
            let code = api.code.clone().unwrap_or_default();
            let r#type = api.r#type.clone().unwrap_or_default();
            ProviderError::new(
                classify_api_error(&api.message, &code, &r#type),
                api.message,
            )
        }
        // A garbled response body is worth another attempt.
        OpenAIError::JSONDeserialize(e) => {
            ProviderError::new(ProviderErrorKind::Transport, e.to_string())
        }
        OpenAIError::InvalidArgument(msg) => {
            ProviderError::new(ProviderErrorKind::InvalidRequest, msg)
        }
        other => ProviderError::new(ProviderErrorKind::Fatal, other.to_string()),
    }
}

/// Classify a provider API error body by its code/type/message strings.
fn classify_api_error(message: &str, code: &str, r#type: &str) -> ProviderErrorKind {
    let haystack = format!("{} {} {}", message, code, r#type).to_lowercase();

    if haystack.contains("insufficient_quota")
        || haystack.contains("billing")
        || haystack.contains("payment required")
        || haystack.contains("402")
    {
        ProviderErrorKind::QuotaExhausted
    } else if haystack.contains("rate limit") || haystack.contains("rate_limit") || haystack.contains("429") {
        ProviderErrorKind::RateLimited
    } else if haystack.contains("api key")
        || haystack.contains("authentication")
        || haystack.contains("invalid_api_key")
        || haystack.contains("401")
    {
        ProviderErrorKind::AuthInvalid
    } else if haystack.contains("forbidden")
        || haystack.contains("permission")
        || haystack.contains("403")
    {
        ProviderErrorKind::Forbidden
    } else if haystack.contains("invalid_request") {
        ProviderErrorKind::InvalidRequest
    } else {
        ProviderErrorKind::Fatal
    }
}
