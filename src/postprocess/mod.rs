//! Optional post-processing of a merged transcript.
//!
//! Three passes, all non-destructive to timing: language fallback
//! detection, an LLM spelling/punctuation pass, and heuristic speaker
//! labelling. Correction failures are swallowed; the job continues with
//! the uncorrected transcript.

mod correction;
mod language;
mod speakers;

pub use correction::{apply_correction, CorrectedSegment, Correction, OpenAiCorrector, TranscriptCorrector};
pub use language::detect_language;
pub use speakers::{label_speakers, MAX_SPEAKERS};

use crate::transcription::MergedTranscript;
use tracing::{info, instrument, warn};

/// Settings for one post-processing run.
#[derive(Debug, Clone)]
pub struct PostProcessOptions {
    /// The job's `source_language` parameter; `None` means auto.
    pub source_language: Option<String>,
    /// Run the heuristic speaker pass.
    pub label_speakers: bool,
    /// Seed for the speaker heuristic's acceptance draws.
    pub speaker_seed: u64,
}

/// Run the post-processing passes in place.
///
/// Downstream consumers always see the post-detection language value.
#[instrument(skip_all)]
pub async fn post_process(
    transcript: &mut MergedTranscript,
    opts: &PostProcessOptions,
    corrector: Option<&dyn TranscriptCorrector>,
) {
    if transcript.language.is_none() {
        let detected = match &opts.source_language {
            Some(lang) => lang.clone(),
            None => detect_language(&transcript.text).to_string(),
        };
        info!(language = %detected, "Filled in missing transcript language");
        transcript.language = Some(detected);
    }

    if let Some(corrector) = corrector {
        let language = transcript.language.clone().unwrap_or_else(|| "en".to_string());
        match corrector.correct(transcript, &language).await {
            Ok(correction) => {
                info!(
                    corrections = correction.corrections.len(),
                    had_errors = correction.has_errors,
                    "Applying correction pass"
                );
                apply_correction(transcript, correction);
            }
            Err(e) => {
                warn!("Correction pass failed, using raw transcript: {}", e);
            }
        }
    }

    if opts.label_speakers {
        label_speakers(&mut transcript.segments, opts.speaker_seed);
    }
}
