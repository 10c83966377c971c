//! Pipeline orchestrator for Ordrett.
//!
//! Owns job lifecycle: admission, state transitions, stage sequencing,
//! cancellation, the overall deadline, and log/temp-file bookkeeping.
//! This is the surface an HTTP layer (or the CLI) drives.

use crate::audio::{self, ArtifactRole, AudioArtifact};
use crate::config::{FetchSettings, PrepareSettings, Settings};
use crate::error::{OrdrettError, Result};
use crate::fetch;
use crate::joblog::{JobLogEntry, JobLogStore, JobLogger};
use crate::postprocess::{self, OpenAiCorrector, PostProcessOptions, TranscriptCorrector};
use crate::render::{render_all, OutputFormat, RenderedFormats};
use crate::tempfiles::TempScope;
use crate::transcription::{
    build_prompt, transcribe_plan, ContentType, SpeechToText, TranscribeOptions,
    TranscriptSegment, WhisperProvider,
};
use crate::validate;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

/// Cap on directly uploaded audio. Larger files must come in by URL.
pub const UPLOAD_LIMIT_BYTES: u64 = 32 * 1024 * 1024;

/// Lifecycle state of a job. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Preparing,
    Transcribing,
    PostProcessing,
    Rendering,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    fn ordinal(self) -> u8 {
        match self {
            JobState::Queued => 0,
            JobState::Preparing => 1,
            JobState::Transcribing => 2,
            JobState::PostProcessing => 3,
            JobState::Rendering => 4,
            JobState::Done => 5,
            JobState::Failed => 6,
            JobState::Cancelled => 7,
        }
    }

    /// Whether the job has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Queued => "queued",
            JobState::Preparing => "preparing",
            JobState::Transcribing => "transcribing",
            JobState::PostProcessing => "postprocessing",
            JobState::Rendering => "rendering",
            JobState::Done => "done",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// User-supplied transcription parameters.
#[derive(Debug, Clone)]
pub struct JobParams {
    /// Which renderers run. Defaults to plain text only.
    pub output_formats: Vec<OutputFormat>,
    /// Prompt template selector.
    pub content_type: ContentType,
    /// Explicit source language; `None` means auto-detect.
    pub source_language: Option<String>,
    /// Free-text keywords prepended to the provider prompt.
    pub keywords: String,
    /// Run the experimental heuristic speaker pass.
    pub enable_speaker_diarization: bool,
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            output_formats: vec![OutputFormat::Txt],
            content_type: ContentType::Podcast,
            source_language: None,
            keywords: String::new(),
            enable_speaker_diarization: false,
        }
    }
}

/// A job submission.
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    /// Caller-chosen job id; generated when absent.
    pub job_id: Option<String>,
    /// Human-readable title, used only in logs.
    pub title: String,
    pub params: JobParams,
}

/// The finished result of a job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub job_id: String,
    pub formats: RenderedFormats,
    pub language: Option<String>,
    pub duration_sec: f64,
    pub segments: Vec<TranscriptSegment>,
    /// Planned slice count, including slices that failed.
    pub total_segments: usize,
}

/// Handle to a running job.
#[derive(Debug)]
pub struct JobHandle {
    job_id: String,
    cancel: CancellationToken,
    state: Arc<Mutex<JobState>>,
    task: JoinHandle<Result<JobOutput>>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Current job state.
    pub fn state(&self) -> JobState {
        *self.state.lock().expect("job state mutex poisoned")
    }

    /// Signal cancellation to every in-flight operation of this job.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<JobOutput> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(OrdrettError::Internal(format!("job task failed: {}", e))),
        }
    }
}

enum JobSource {
    Url(String),
    Bytes { bytes: Vec<u8>, ext: String },
}

/// The main orchestrator. Cheap to share; jobs run on spawned tasks.
pub struct Orchestrator {
    settings: Settings,
    provider: Arc<dyn SpeechToText>,
    corrector: Option<Arc<dyn TranscriptCorrector>>,
    logs: JobLogStore,
    http: reqwest::Client,
    temp_root: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator with the production provider stack.
    pub fn new(settings: Settings) -> Result<Self> {
        let corrector: Option<Arc<dyn TranscriptCorrector>> =
            if settings.postprocess.enable_correction {
                Some(Arc::new(OpenAiCorrector::new(
                    &settings.postprocess.correction_model,
                )))
            } else {
                None
            };
        Self::with_components(settings, Arc::new(WhisperProvider::new()), corrector)
    }

    /// Create an orchestrator with injected components. Tests use this
    /// to substitute a deterministic provider.
    pub fn with_components(
        settings: Settings,
        provider: Arc<dyn SpeechToText>,
        corrector: Option<Arc<dyn TranscriptCorrector>>,
    ) -> Result<Self> {
        let temp_root = settings.temp_dir();
        std::fs::create_dir_all(&temp_root)?;

        let http = fetch::build_client(&settings.fetch)?;

        Ok(Self {
            settings,
            provider,
            corrector,
            logs: JobLogStore::new(),
            http,
            temp_root,
        })
    }

    /// Non-blocking snapshot of a job's log.
    pub fn poll_logs(&self, job_id: &str) -> Vec<JobLogEntry> {
        self.logs.snapshot(job_id)
    }

    /// Submit a job whose audio is fetched from a URL.
    pub fn submit_url(&self, request: JobRequest, url: &str) -> JobHandle {
        self.spawn_job(request, JobSource::Url(url.to_string()))
    }

    /// Submit a job from already-uploaded audio bytes.
    ///
    /// The upload cap is enforced here, before any pipeline work.
    pub fn submit_bytes(
        &self,
        request: JobRequest,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<JobHandle> {
        let observed = bytes.len() as u64;
        if observed > UPLOAD_LIMIT_BYTES {
            return Err(OrdrettError::UploadTooLarge {
                observed,
                limit: UPLOAD_LIMIT_BYTES,
            });
        }
        if bytes.is_empty() {
            return Err(OrdrettError::InvalidInput("no audio supplied".into()));
        }

        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_else(|| "mp3".to_string());

        Ok(self.spawn_job(request, JobSource::Bytes { bytes, ext }))
    }

    fn spawn_job(&self, request: JobRequest, source: JobSource) -> JobHandle {
        let job_id = request
            .job_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let cancel = CancellationToken::new();
        let state = Arc::new(Mutex::new(JobState::Queued));
        let logger = JobLogger::new(self.logs.clone(), job_id.clone());

        logger.info("job", &format!("Job '{}' queued", request.title));

        let ctx = JobContext {
            provider: self.provider.clone(),
            corrector: self.corrector.clone(),
            http: self.http.clone(),
            logger: logger.clone(),
            cancel: cancel.clone(),
            state: state.clone(),
            params: request.params,
            model: self.settings.transcription.model.clone(),
            speaker_seed: self.settings.postprocess.speaker_seed,
            fetch: self.settings.fetch.clone(),
            prepare: self.settings.prepare.clone(),
            temp_root: self.temp_root.clone(),
        };

        let deadline = self.settings.deadline();
        let logs = self.logs.clone();
        let task_state = state.clone();
        let task_cancel = cancel.clone();
        let task_job_id = job_id.clone();

        let task = tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = task_cancel.cancelled() => Err(OrdrettError::Cancelled),
                _ = tokio::time::sleep(deadline) => Err(OrdrettError::Timeout),
                result = run_job(ctx, source, task_job_id.clone()) => result,
            };

            match &result {
                Ok(_) => {
                    set_state(&task_state, JobState::Done, &logger);
                    logger.success("job", "Job complete");
                }
                Err(OrdrettError::Cancelled) => {
                    set_state(&task_state, JobState::Cancelled, &logger);
                    logger.warn("job", "Job cancelled");
                }
                Err(e) => {
                    set_state(&task_state, JobState::Failed, &logger);
                    let user = e.to_user_error();
                    logger.error("job", &format!("{:?}: {}", user.class, user.message));
                }
            }

            logs.schedule_removal(&task_job_id);
            result
        });

        JobHandle {
            job_id,
            cancel,
            state,
            task,
        }
    }
}

struct JobContext {
    provider: Arc<dyn SpeechToText>,
    corrector: Option<Arc<dyn TranscriptCorrector>>,
    http: reqwest::Client,
    logger: JobLogger,
    cancel: CancellationToken,
    state: Arc<Mutex<JobState>>,
    params: JobParams,
    model: String,
    speaker_seed: u64,
    fetch: FetchSettings,
    prepare: PrepareSettings,
    temp_root: PathBuf,
}

/// Advance the job state. Transitions only move forward; stale updates
/// after a terminal state are ignored.
fn set_state(state: &Arc<Mutex<JobState>>, next: JobState, logger: &JobLogger) {
    let mut current = state.lock().expect("job state mutex poisoned");
    if current.is_terminal() || next.ordinal() <= current.ordinal() {
        return;
    }
    *current = next;
    logger.info("job", &format!("State: {}", next));
}

/// The pipeline proper: fetch, validate, prepare, transcribe, merge,
/// post-process, render. The temp scope covers every exit path.
#[instrument(skip_all, fields(job_id = %job_id))]
async fn run_job(ctx: JobContext, source: JobSource, job_id: String) -> Result<JobOutput> {
    set_state(&ctx.state, JobState::Preparing, &ctx.logger);
    let scope = TempScope::create(&ctx.temp_root, &job_id)?;

    // Acquire the original audio into the job's temp directory.
    let (bytes, ext) = match source {
        JobSource::Url(url) => {
            ctx.logger.info("fetch", &format!("Fetching {}", url));
            let progress_logger = ctx.logger.clone();
            let progress = move |bytes: u64| {
                progress_logger.info(
                    "fetch",
                    &format!("Downloaded {:.1} MiB", bytes as f64 / (1024.0 * 1024.0)),
                );
            };
            let bytes = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Err(OrdrettError::Cancelled),
                result = fetch::fetch_audio(&ctx.http, &url, ctx.fetch.max_redirects, &progress) => result?,
            };
            let ext = fetch::extension_from_url(&url);
            ctx.logger
                .success("fetch", &format!("Fetched {} bytes", bytes.len()));
            (bytes, ext)
        }
        JobSource::Bytes { bytes, ext } => {
            ctx.logger
                .info("fetch", &format!("Using uploaded audio ({} bytes)", bytes.len()));
            (bytes, ext)
        }
    };

    let original_path = scope.path().join(format!("original.{}", ext));
    tokio::fs::write(&original_path, &bytes).await?;
    drop(bytes);

    validate::validate(&original_path).await?;
    ctx.logger.success("validate", "Audio container validated");

    let original = AudioArtifact::from_path(original_path, ArtifactRole::Original).await?;
    let plan = audio::prepare(original, scope.path(), &ctx.prepare).await?;
    ctx.logger.success(
        "prepare",
        &format!("Prepared plan with {} request(s)", plan.request_count()),
    );

    set_state(&ctx.state, JobState::Transcribing, &ctx.logger);

    let language = ctx
        .params
        .source_language
        .as_deref()
        .filter(|lang| !lang.eq_ignore_ascii_case("auto"))
        .map(|lang| lang.to_string());
    let prompt = build_prompt(
        ctx.params.content_type,
        language.as_deref(),
        &ctx.params.keywords,
    );
    let opts = TranscribeOptions {
        model: ctx.model.clone(),
        language: language.clone(),
        prompt: Some(prompt),
    };

    let slice_logger = ctx.logger.clone();
    let on_slice_done = move |outcome: crate::transcription::SliceOutcome| {
        if outcome.success {
            slice_logger.success(
                "transcribe",
                &format!("Slice {}/{} transcribed", outcome.index + 1, outcome.total),
            );
        } else {
            slice_logger.warn(
                "transcribe",
                &format!(
                    "Slice {}/{} failed: {}",
                    outcome.index + 1,
                    outcome.total,
                    outcome.error.as_deref().unwrap_or("unknown")
                ),
            );
        }
    };

    let mut merged =
        transcribe_plan(&*ctx.provider, &plan, &opts, &ctx.cancel, &on_slice_done).await?;
    ctx.logger.success(
        "transcribe",
        &format!("Merged {} segment(s)", merged.segments.len()),
    );

    set_state(&ctx.state, JobState::PostProcessing, &ctx.logger);
    let pp_opts = PostProcessOptions {
        source_language: language,
        label_speakers: ctx.params.enable_speaker_diarization,
        speaker_seed: ctx.speaker_seed,
    };
    postprocess::post_process(&mut merged, &pp_opts, ctx.corrector.as_deref()).await;
    ctx.logger.success(
        "postprocess",
        &format!(
            "Post-processing done (language: {})",
            merged.language.as_deref().unwrap_or("unknown")
        ),
    );

    set_state(&ctx.state, JobState::Rendering, &ctx.logger);
    let formats = render_all(&merged, &ctx.params.output_formats);
    ctx.logger
        .success("render", &format!("Rendered {} format(s)", formats.len()));

    scope.cleanup();

    info!(%job_id, "Job finished");
    Ok(JobOutput {
        job_id,
        formats,
        language: merged.language,
        duration_sec: merged.duration_sec,
        segments: merged.segments,
        total_segments: merged.total_segments,
    })
}
