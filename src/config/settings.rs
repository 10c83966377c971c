//! Configuration settings for Ordrett.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub fetch: FetchSettings,
    pub prepare: PrepareSettings,
    pub transcription: TranscriptionSettings,
    pub postprocess: PostProcessSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for per-job temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/ordrett".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Audio fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Per-request read timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum redirect hops before giving up.
    pub max_redirects: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
            max_redirects: 5,
        }
    }
}

impl FetchSettings {
    /// Effective read timeout.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

/// Audio preparation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareSettings {
    /// Fixed slice length in seconds. This same value drives the
    /// merger's offset arithmetic, so it is declared here once and
    /// never derived per slice.
    pub segment_duration_sec: u32,
    /// Target bitrate for the compression transcode, in kbit/s.
    pub audio_bitrate_kbps: u32,
}

impl Default for PrepareSettings {
    fn default() -> Self {
        Self {
            segment_duration_sec: crate::audio::SEGMENT_DURATION_SEC,
            audio_bitrate_kbps: 48,
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Provider model for speech-to-text.
    pub model: String,
    /// Overall job deadline in minutes. Clamped to 60.
    pub deadline_minutes: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            deadline_minutes: 30,
        }
    }
}

/// Post-processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessSettings {
    /// Run the LLM spelling/punctuation pass.
    pub enable_correction: bool,
    /// Chat model used for the correction pass.
    pub correction_model: String,
    /// Seed for the speaker-labelling heuristic.
    pub speaker_seed: u64,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            enable_correction: true,
            correction_model: "gpt-4o-mini".to_string(),
            speaker_seed: 42,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::OrdrettError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ordrett")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Effective job deadline, clamped to the 60-minute maximum.
    pub fn deadline(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.transcription.deadline_minutes.clamp(1, 60) * 60)
    }
}
