//! Ordrett - Batch Podcast Transcription
//!
//! A pipeline for turning podcast audio into time-stamped transcripts.
//!
//! The name "Ordrett" comes from the Norwegian word for "verbatim."
//!
//! # Overview
//!
//! Ordrett takes one audio source (a URL or uploaded bytes) through:
//! - fetching with redirect handling and progress reporting
//! - container validation by extension and magic bytes
//! - size-adaptive preparation (transcode and/or time-slicing)
//! - bounded-concurrent speech-to-text requests with retry and backoff
//! - timestamp-correct merging using fixed slice offsets
//! - optional LLM correction and heuristic speaker labelling
//! - rendering to TXT, SRT, WebVTT, and JSON
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `fetch` - HTTP audio acquisition
//! - `validate` - Container validation
//! - `audio` - Transcode and slicing plans
//! - `transcription` - Provider interface, worker pool, merging
//! - `postprocess` - Language detection, correction, speaker labelling
//! - `render` - Output formats
//! - `joblog` - Per-job log buffers for live polling
//! - `tempfiles` - Scoped temp-file custody
//! - `orchestrator` - Job lifecycle and the core API
//!
//! # Example
//!
//! ```rust,no_run
//! use ordrett::config::Settings;
//! use ordrett::orchestrator::{JobRequest, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let handle = orchestrator.submit_url(
//!         JobRequest { title: "Episode 42".into(), ..Default::default() },
//!         "https://cdn.example.com/episode-42.mp3",
//!     );
//!     let output = handle.wait().await?;
//!     println!("Transcribed {} segments", output.segments.len());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod joblog;
pub mod openai;
pub mod orchestrator;
pub mod postprocess;
pub mod render;
pub mod tempfiles;
pub mod transcription;
pub mod validate;

pub use error::{OrdrettError, Result};
