//! CLI module for Ordrett.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Ordrett - Batch Podcast Transcription
///
/// Turns podcast audio into time-stamped transcripts in multiple
/// subtitle/document formats. The name "Ordrett" comes from the
/// Norwegian word for "verbatim."
#[derive(Parser, Debug)]
#[command(name = "ordrett")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Transcribe a podcast episode from a URL or local file
    Transcribe {
        /// Episode URL or local audio file path
        input: String,

        /// Title used in logs and output file names
        #[arg(short, long)]
        title: Option<String>,

        /// Comma-separated output formats (txt, srt, vtt, json)
        #[arg(long, default_value = "txt")]
        formats: String,

        /// Content type for the provider prompt (podcast, interview, lecture)
        #[arg(long, default_value = "podcast")]
        content_type: String,

        /// Source language tag, or "auto" to let the provider detect
        #[arg(long, default_value = "auto")]
        language: String,

        /// Keywords prepended to the provider prompt
        #[arg(long, default_value = "")]
        keywords: String,

        /// Run the experimental heuristic speaker labelling
        #[arg(long)]
        speakers: bool,

        /// Directory for output files (defaults to the current directory)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
