//! LLM-based spelling and punctuation pass.
//!
//! Best-effort: any failure is logged by the caller and the transcript
//! is used uncorrected. Timing is never touched; only segment texts and
//! the full text are replaced.

use crate::error::{OrdrettError, Result};
use crate::openai::create_client;
use crate::transcription::{format_timestamp, MergedTranscript};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

/// How many segments are shown to the correction model. Long episodes
/// get their tail corrected only through the full-text field.
const MAX_SEGMENTS_IN_PROMPT: usize = 50;

const CORRECTION_SYSTEM_PROMPT: &str = "You are a transcript editor. Fix spelling, \
punctuation, and obvious mis-hearings in the transcript without changing meaning, \
wording order, or timing. Respond with JSON: {\"correctedText\": \"...\", \
\"correctedSegments\": [{\"start\": 0.0, \"end\": 5.0, \"text\": \"...\"}], \
\"corrections\": [\"what changed\"], \"hasErrors\": true}. Keep every start/end \
value exactly as given. correctedSegments must have the same length and order as \
the input segments.";

/// A corrected segment returned by the model. Timing must round-trip
/// unchanged; only the text is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// The correction model's full response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub corrected_text: String,
    #[serde(default)]
    pub corrected_segments: Vec<CorrectedSegment>,
    #[serde(default)]
    pub corrections: Vec<String>,
    #[serde(default)]
    pub has_errors: bool,
}

/// Trait for transcript correction backends.
#[async_trait]
pub trait TranscriptCorrector: Send + Sync {
    /// Produce a corrected rendition of the transcript.
    async fn correct(&self, transcript: &MergedTranscript, language: &str) -> Result<Correction>;
}

/// Chat-completion-backed corrector.
pub struct OpenAiCorrector {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAiCorrector {
    pub fn new(model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptCorrector for OpenAiCorrector {
    #[instrument(skip(self, transcript), fields(model = %self.model, language))]
    async fn correct(&self, transcript: &MergedTranscript, language: &str) -> Result<Correction> {
        let user_prompt = build_user_prompt(transcript, language);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(CORRECTION_SYSTEM_PROMPT)
                .build()
                .map_err(|e| OrdrettError::Internal(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| OrdrettError::Internal(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| OrdrettError::Internal(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| OrdrettError::ProviderTransientFailed(format!("correction: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| {
                OrdrettError::ProviderTransientFailed("correction returned no content".into())
            })?;

        let correction: Correction = serde_json::from_str(&content)?;
        debug!(
            corrections = correction.corrections.len(),
            "Correction pass returned"
        );
        Ok(correction)
    }
}

/// Build the user prompt: language hint, full text, and the first
/// [`MAX_SEGMENTS_IN_PROMPT`] segments with timestamp labels.
fn build_user_prompt(transcript: &MergedTranscript, language: &str) -> String {
    let mut prompt = format!(
        "Language: {}\n\nFull transcript:\n{}\n\nSegments:\n",
        language, transcript.text
    );
    for segment in transcript.segments.iter().take(MAX_SEGMENTS_IN_PROMPT) {
        prompt.push_str(&format!(
            "[{} - {}] {{\"start\": {}, \"end\": {}}} {}\n",
            format_timestamp(segment.start),
            format_timestamp(segment.end),
            segment.start,
            segment.end,
            segment.text
        ));
    }
    prompt
}

/// Merge a correction back into the transcript.
///
/// The full text is replaced and corrected segment texts are matched by
/// positional index. Timing, words, and speakers on the existing
/// segments are preserved regardless of what the model sent back.
pub fn apply_correction(transcript: &mut MergedTranscript, correction: Correction) {
    transcript.text = correction.corrected_text;
    for (segment, corrected) in transcript
        .segments
        .iter_mut()
        .zip(correction.corrected_segments)
    {
        segment.text = corrected.text;
    }
    transcript.processed = true;
}
