//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::process::Command;

/// Outcome of a single diagnostic.
#[derive(Debug, PartialEq)]
enum CheckOutcome {
    Pass(String),
    Warn { message: String, hint: String },
    Fail { message: String, hint: String },
}

/// One named diagnostic with its outcome.
struct Check {
    name: &'static str,
    outcome: CheckOutcome,
}

impl Check {
    fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            outcome: CheckOutcome::Pass(message.into()),
        }
    }

    fn warn(name: &'static str, message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            outcome: CheckOutcome::Warn {
                message: message.into(),
                hint: hint.into(),
            },
        }
    }

    fn fail(name: &'static str, message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            outcome: CheckOutcome::Fail {
                message: message.into(),
                hint: hint.into(),
            },
        }
    }

    fn failed(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Fail { .. })
    }

    fn warned(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Warn { .. })
    }

    fn print(&self) {
        let (icon, message, hint) = match &self.outcome {
            CheckOutcome::Pass(message) => (style("✓").green(), message, None),
            CheckOutcome::Warn { message, hint } => (style("!").yellow(), message, Some(hint)),
            CheckOutcome::Fail { message, hint } => (style("✗").red(), message, Some(hint)),
        };

        println!("  {} {} - {}", icon, style(self.name).bold(), message);
        if let Some(hint) = hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Ordrett Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let sections: Vec<(&str, Vec<Check>)> = vec![
        ("External Tools", vec![check_ffmpeg()]),
        ("API Configuration", vec![check_api_key()]),
        ("Directories", vec![check_temp_dir(settings)]),
        ("Configuration", vec![check_config_file()]),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            errors += check.failed() as usize;
            warnings += check.warned() as usize;
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Ordrett.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Ordrett is ready to use.");
    }

    Ok(())
}

/// The preparer shells out to ffmpeg for oversize audio; confirm it
/// runs and report its banner line.
fn check_ffmpeg() -> Check {
    match Command::new("ffmpeg").arg("-version").output() {
        Ok(out) if out.status.success() => {
            let banner = String::from_utf8_lossy(&out.stdout);
            let version = banner.lines().next().unwrap_or("installed").trim();
            Check::pass("ffmpeg", truncate(version, 50))
        }
        Ok(_) => Check::fail("ffmpeg", "found but exited with an error", ffmpeg_hint()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Check::fail("ffmpeg", "not on PATH", ffmpeg_hint())
        }
        Err(e) => Check::fail("ffmpeg", format!("could not run: {}", e), ffmpeg_hint()),
    }
}

/// Transcription and correction both go through the OpenAI API.
fn check_api_key() -> Check {
    const NAME: &str = "OPENAI_API_KEY";
    let set_hint = "export OPENAI_API_KEY=... before running ordrett transcribe";

    match std::env::var(NAME) {
        Ok(key) if key.trim().is_empty() => {
            Check::fail(NAME, "set but empty, provider calls will be rejected", set_hint)
        }
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => Check::pass(
            NAME,
            format!("present ({} chars, ends ...{})", key.len(), &key[key.len() - 4..]),
        ),
        Ok(_) => Check::warn(
            NAME,
            "present but does not look like an OpenAI key",
            "OpenAI keys start with sk-",
        ),
        Err(_) => Check::fail(NAME, "not set, provider calls will be rejected", set_hint),
    }
}

/// Every job gets its own scoped directory under the temp root.
fn check_temp_dir(settings: &Settings) -> Check {
    let temp_dir = settings.temp_dir();
    match std::fs::create_dir_all(&temp_dir) {
        Ok(()) => Check::pass("Temp directory", temp_dir.display().to_string()),
        Err(e) => Check::fail(
            "Temp directory",
            format!("{} ({})", temp_dir.display(), e),
            "Point general.temp_dir at a writable location",
        ),
    }
}

fn check_config_file() -> Check {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Check::pass("Config file", config_path.display().to_string())
    } else {
        Check::warn(
            "Config file",
            "using built-in defaults",
            "Create one at the path shown by: ordrett config path",
        )
    }
}

fn ffmpeg_hint() -> String {
    let install = if cfg!(target_os = "macos") {
        "brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "apt install ffmpeg (or your distribution's equivalent)"
    } else {
        "see https://ffmpeg.org/download.html"
    };
    format!("oversize audio cannot be prepared without it; install with: {}", install)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_outcome_predicates() {
        let pass = Check::pass("a", "fine");
        let warn = Check::warn("b", "odd", "look");
        let fail = Check::fail("c", "broken", "fix");

        assert!(!pass.failed() && !pass.warned());
        assert!(warn.warned() && !warn.failed());
        assert!(fail.failed() && !fail.warned());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 50), "short");
        let long = "x".repeat(60);
        let cut = truncate(&long, 50);
        assert_eq!(cut.len(), 53);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_ffmpeg_hint_names_an_install_route() {
        let hint = ffmpeg_hint();
        assert!(hint.contains("install") || hint.contains("ffmpeg.org"));
    }
}
