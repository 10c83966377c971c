//! Bounded-concurrency transcription driver with retry and backoff.

use super::merge;
use super::{
    MergedTranscript, RawTranscript, SpeechToText, TranscribeOptions, CONCURRENT_LIMIT,
};
use crate::audio::Plan;
use crate::error::{OrdrettError, Result};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Attempt budget for single-file plans.
pub const SINGLE_FILE_ATTEMPTS: u32 = 5;

/// Attempt budget per slice in segmented plans.
pub const SEGMENT_ATTEMPTS: u32 = 3;

/// Ceiling on any single backoff sleep.
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Outcome notification for one slice, fired as workers finish.
#[derive(Debug, Clone)]
pub struct SliceOutcome {
    pub index: usize,
    pub total: usize,
    pub success: bool,
    pub error: Option<String>,
}

/// Exponential backoff delay before retrying `attempt + 1`.
/// `attempt` is 1-based.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    (base * factor).min(BACKOFF_CAP)
}

/// Drive a whole plan through the provider and merge the results.
///
/// Slices are dispatched in index order through a pool of
/// [`CONCURRENT_LIMIT`] workers; completion order is unconstrained and
/// the merge restores index order. A slice that fails — whether it
/// exhausted its retries or hit a non-retryable error on the first
/// attempt — becomes a gap in the merged transcript rather than a job
/// failure; the merger still advances the timeline past it. Only
/// cancellation stops the remaining slices.
#[instrument(skip_all, fields(requests = plan.request_count()))]
pub async fn transcribe_plan(
    provider: &dyn SpeechToText,
    plan: &Plan,
    opts: &TranscribeOptions,
    cancel: &CancellationToken,
    on_slice_done: &(dyn Fn(SliceOutcome) + Send + Sync),
) -> Result<MergedTranscript> {
    match plan {
        Plan::Single(artifact) => {
            let raw = transcribe_with_retry(
                provider,
                &artifact.path,
                opts,
                SINGLE_FILE_ATTEMPTS,
                cancel,
            )
            .await?;
            on_slice_done(SliceOutcome {
                index: 0,
                total: 1,
                success: true,
                error: None,
            });
            Ok(merge::from_single(raw, &opts.model))
        }
        Plan::Segmented {
            artifacts,
            segment_duration_sec,
        } => {
            let total = artifacts.len();
            info!(total, "Transcribing segmented plan");

            let slice_paths: Vec<(usize, std::path::PathBuf)> = artifacts
                .iter()
                .enumerate()
                .map(|(index, artifact)| (index, artifact.path.clone()))
                .collect();

            let mut in_flight = stream::iter(slice_paths)
                .map(|(index, path)| async move {
                    let result = transcribe_with_retry(
                        provider,
                        &path,
                        opts,
                        SEGMENT_ATTEMPTS,
                        cancel,
                    )
                    .await;
                    (index, result)
                })
                .buffer_unordered(CONCURRENT_LIMIT);

            let mut successes: Vec<(usize, RawTranscript)> = Vec::with_capacity(total);
            let mut first_failure: Option<OrdrettError> = None;

            while let Some((index, result)) = in_flight.next().await {
                match result {
                    Ok(raw) => {
                        on_slice_done(SliceOutcome {
                            index,
                            total,
                            success: true,
                            error: None,
                        });
                        successes.push((index, raw));
                    }
                    Err(err @ OrdrettError::Cancelled) => {
                        // Dropping the stream cancels in-flight workers.
                        return Err(err);
                    }
                    Err(err) => {
                        warn!(index, "Slice failed, skipping: {}", err);
                        on_slice_done(SliceOutcome {
                            index,
                            total,
                            success: false,
                            error: Some(err.to_string()),
                        });
                        first_failure.get_or_insert(err);
                    }
                }
            }

            if successes.is_empty() {
                return Err(first_failure.unwrap_or_else(|| {
                    OrdrettError::ProviderTransientFailed("all slices failed".into())
                }));
            }

            Ok(merge::merge_segmented(
                successes,
                total,
                *segment_duration_sec,
                &opts.model,
            ))
        }
    }
}

/// One provider call with the retry/backoff policy applied.
///
/// The provider re-reads the audio file on every call, so each attempt
/// gets a fresh input stream.
async fn transcribe_with_retry(
    provider: &dyn SpeechToText,
    audio: &Path,
    opts: &TranscribeOptions,
    max_attempts: u32,
    cancel: &CancellationToken,
) -> Result<RawTranscript> {
    let mut attempt: u32 = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(OrdrettError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OrdrettError::Cancelled),
            result = provider.transcribe(audio, opts) => result,
        };

        match result {
            Ok(raw) => return Ok(raw),
            Err(err) if err.retryable() && attempt < max_attempts => {
                let delay = backoff_delay(err.backoff_base(), attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs(),
                    "Provider call failed, retrying: {}",
                    err
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(OrdrettError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_secs(5);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(5));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(10));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(20));
        // 5 * 2^3 = 40, capped at 30.
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(30));

        let slow = Duration::from_secs(2);
        assert_eq!(backoff_delay(slow, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(slow, 4), Duration::from_secs(16));
        assert_eq!(backoff_delay(slow, 5), Duration::from_secs(30));
    }

}
