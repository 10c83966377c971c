//! Shared OpenAI client construction.
//!
//! One client configuration serves both the transcription provider and
//! the correction pass; the client itself is stateless per call and
//! safe to share across jobs.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default request timeout. Whisper uploads of near-limit files can
/// take a while on slow links.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Client<OpenAIConfig> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom request timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}
