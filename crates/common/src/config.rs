//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{VoxtrimError, VoxtrimResult};

const MIB: u64 = 1024 * 1024;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Conditioning and compression settings.
    pub pipeline: PipelineConfig,

    /// Remote speech-to-text settings.
    pub transcription: TranscriptionConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Tunables for the preprocessing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard ceiling for the compressed output, in bytes.
    pub max_output_bytes: u64,

    /// Inputs larger than this start at `large_input_bitrate_kbps`.
    pub large_input_threshold_bytes: u64,

    /// First bitrate tried for regular inputs.
    pub initial_bitrate_kbps: u32,

    /// First bitrate tried for inputs above the threshold.
    pub large_input_bitrate_kbps: u32,

    /// The search never goes below this bitrate.
    pub min_bitrate_kbps: u32,

    /// Multiplier applied to the bitrate after an oversized attempt.
    pub bitrate_decay: f64,

    /// Maximum number of encode attempts.
    pub max_attempts: u32,

    /// Samples per channel fed to the encoder per call.
    pub block_size: usize,

    /// Peak amplitude after normalization.
    pub target_peak: f32,

    /// Samples quieter than this are attenuated.
    pub noise_gate_threshold: f32,

    /// Gain applied to gated samples.
    pub noise_gate_attenuation: f32,
}

/// Remote transcription service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Speech-to-text endpoint.
    pub api_url: String,

    /// Model identifier sent with each request.
    pub model_id: String,

    /// Ask the service to label non-speech audio events.
    pub tag_audio_events: bool,

    /// Ask the service to label words by speaker.
    pub diarize: bool,

    /// Environment variable holding the API key, if any.
    pub api_key_env: Option<String>,

    /// Maximum number of files accepted in one batch.
    pub max_files: usize,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voxtrim=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: 300 * MIB,
            large_input_threshold_bytes: 100 * MIB,
            initial_bitrate_kbps: 128,
            large_input_bitrate_kbps: 64,
            min_bitrate_kbps: 32,
            bitrate_decay: 0.6,
            max_attempts: 5,
            block_size: 1152,
            target_peak: 0.95,
            noise_gate_threshold: 0.01,
            noise_gate_attenuation: 0.1,
        }
    }
}

impl PipelineConfig {
    /// Check that the settings describe a search that can terminate.
    pub fn validate(&self) -> VoxtrimResult<()> {
        if self.block_size == 0 {
            return Err(VoxtrimError::config("block_size must be greater than 0"));
        }
        if self.max_attempts == 0 {
            return Err(VoxtrimError::config("max_attempts must be at least 1"));
        }
        if !(self.bitrate_decay > 0.0 && self.bitrate_decay < 1.0) {
            return Err(VoxtrimError::config(format!(
                "bitrate_decay must be in (0, 1), got {}",
                self.bitrate_decay
            )));
        }
        if self.min_bitrate_kbps == 0 {
            return Err(VoxtrimError::config("min_bitrate_kbps must be greater than 0"));
        }
        if self.min_bitrate_kbps > self.initial_bitrate_kbps
            || self.min_bitrate_kbps > self.large_input_bitrate_kbps
        {
            return Err(VoxtrimError::config(
                "min_bitrate_kbps must not exceed the initial bitrates",
            ));
        }
        if !(self.target_peak > 0.0 && self.target_peak <= 1.0) {
            return Err(VoxtrimError::config(format!(
                "target_peak must be in (0, 1], got {}",
                self.target_peak
            )));
        }
        if self.noise_gate_threshold < 0.0 || self.noise_gate_attenuation < 0.0 {
            return Err(VoxtrimError::config("noise gate settings must be non-negative"));
        }
        Ok(())
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.elevenlabs.io/v1/speech-to-text".to_string(),
            model_id: "scribe_v2".to_string(),
            tag_audio_events: true,
            diarize: true,
            api_key_env: Some("ELEVENLABS_API_KEY".to_string()),
            max_files: 10,
            timeout_secs: 600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_or_default(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load_from(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from `path`, surfacing read and parse errors.
    pub fn load_from(path: &Path) -> VoxtrimResult<Self> {
        if !path.exists() {
            return Err(VoxtrimError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config as pretty JSON to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("voxtrim").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_output_bytes, 314_572_800);
        assert_eq!(config.large_input_threshold_bytes, 104_857_600);
        assert_eq!(config.block_size, 1152);
        assert_eq!(config.max_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "pipeline": { "max_attempts": 3 } }"#).unwrap();
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.pipeline.initial_bitrate_kbps, 128);
        assert_eq!(config.transcription.model_id, "scribe_v2");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_bad_decay() {
        let config = PipelineConfig {
            bitrate_decay: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(VoxtrimError::Config { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_floor_above_start() {
        let config = PipelineConfig {
            min_bitrate_kbps: 96,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_block_size() {
        let config = PipelineConfig {
            block_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.pipeline.max_attempts = 7;
        config.transcription.diarize = false;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.pipeline, config.pipeline);
        assert_eq!(loaded.transcription, config.transcription);
    }

    #[test]
    fn test_load_or_default_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let loaded = AppConfig::load_or_default(&path);
        assert_eq!(loaded.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, VoxtrimError::FileNotFound { .. }));
    }
}
