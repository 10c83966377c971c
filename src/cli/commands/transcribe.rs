//! Transcribe command - run the full pipeline from the CLI.

use crate::cli::output::format_duration;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{JobHandle, JobParams, JobRequest, Orchestrator};
use crate::render::OutputFormat;
use crate::transcription::ContentType;
use std::path::{Path, PathBuf};

#[allow(clippy::too_many_arguments)]
pub async fn run_transcribe(
    input: &str,
    title: Option<String>,
    formats: &str,
    content_type: &str,
    language: &str,
    keywords: &str,
    speakers: bool,
    output_dir: Option<String>,
    settings: Settings,
) -> anyhow::Result<()> {
    let output_formats = parse_formats(formats)?;
    let content_type: ContentType = content_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let title = title.unwrap_or_else(|| derive_title(input));
    let params = JobParams {
        output_formats: output_formats.clone(),
        content_type,
        source_language: if language.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(language.to_string())
        },
        keywords: keywords.to_string(),
        enable_speaker_diarization: speakers,
    };
    let request = JobRequest {
        job_id: None,
        title: title.clone(),
        params,
    };

    let orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!("Transcribing '{}'", title));
    let handle = submit(&orchestrator, request, input).await?;
    let job_id = handle.job_id().to_string();

    let spinner = Output::spinner("Running transcription pipeline...");
    let result = handle.wait().await;
    spinner.finish_and_clear();

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            let user = e.to_user_error();
            Output::error(&format!("{:?}: {}", user.class, user.message));
            for suggestion in &user.suggestions {
                Output::suggestion(suggestion);
            }
            // Logs are still pollable for a few minutes; point at them.
            Output::warning(&format!("Job id for log inspection: {}", job_id));
            std::process::exit(1);
        }
    };

    Output::success("Transcription complete");
    Output::kv("Language", output.language.as_deref().unwrap_or("unknown"));
    Output::kv("Duration", &format_duration(output.duration_sec));
    Output::kv("Segments", &output.segments.len().to_string());

    let dir = output_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)?;

    let stem = sanitize_file_stem(&title);
    for (format, content) in &output.formats {
        let path = dir.join(format!("{}.{}", stem, format));
        std::fs::write(&path, content)?;
        Output::kv("Wrote", &path.display().to_string());
    }

    Ok(())
}

/// Submit from a local file when the input exists on disk, else as URL.
async fn submit(
    orchestrator: &Orchestrator,
    request: JobRequest,
    input: &str,
) -> anyhow::Result<JobHandle> {
    let path = Path::new(input);
    if path.exists() {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3");
        Ok(orchestrator.submit_bytes(request, bytes, filename)?)
    } else {
        Ok(orchestrator.submit_url(request, input))
    }
}

/// Parse the comma-separated formats flag.
fn parse_formats(formats: &str) -> anyhow::Result<Vec<OutputFormat>> {
    let mut parsed = Vec::new();
    for part in formats.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let format: OutputFormat = part.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        if !parsed.contains(&format) {
            parsed.push(format);
        }
    }
    if parsed.is_empty() {
        anyhow::bail!("No output formats requested");
    }
    Ok(parsed)
}

/// Derive a display title from the input path or URL.
fn derive_title(input: &str) -> String {
    input
        .rsplit('/')
        .next()
        .and_then(|name| name.split('?').next())
        .map(|name| name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name))
        .filter(|s| !s.is_empty())
        .unwrap_or("episode")
        .to_string()
}

/// Keep output file names shell-friendly.
fn sanitize_file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "transcript".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        let formats = parse_formats("txt, srt,json").unwrap();
        assert_eq!(
            formats,
            vec![OutputFormat::Txt, OutputFormat::Srt, OutputFormat::Json]
        );
        // Duplicates collapse.
        assert_eq!(parse_formats("txt,txt").unwrap().len(), 1);
        assert!(parse_formats("docx").is_err());
        assert!(parse_formats("").is_err());
    }

    #[test]
    fn test_derive_title() {
        assert_eq!(
            derive_title("https://cdn.example.com/shows/ep-42.mp3?sig=abc"),
            "ep-42"
        );
        assert_eq!(derive_title("local-file.wav"), "local-file");
        assert_eq!(derive_title(""), "episode");
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("Episode 42: The End"), "Episode_42__The_End");
        assert_eq!(sanitize_file_stem(""), "transcript");
    }
}
