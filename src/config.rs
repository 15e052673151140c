use std::env;
use std::time::Duration;

use crate::core::providers::gemini::GEMINI_BASE_URL;
use crate::core::voice::{VoiceName, DEFAULT_VOICE};

/// Model used to classify paragraph speakers in smart-voice mode.
pub const DEFAULT_CLASSIFY_MODEL: &str = "gemini-3-flash-preview";
/// Model used for speech synthesis.
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },
}

/// Reader configuration, usually loaded from the environment.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub api_key: String,
    pub base_url: String,
    pub classify_model: String,
    pub tts_model: String,
    pub request_timeout_seconds: u64,
    pub default_voice: VoiceName,
    pub smart_voice: bool,
}

impl ReaderConfig {
    /// Build a configuration with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            classify_model: DEFAULT_CLASSIFY_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            default_voice: DEFAULT_VOICE,
            smart_voice: true,
        }
    }

    /// Load configuration from the environment.
    ///
    /// `GEMINI_API_KEY` is required; everything else falls back to defaults:
    /// `GEMINI_BASE_URL`, `LECTERN_CLASSIFY_MODEL`, `LECTERN_TTS_MODEL`,
    /// `LECTERN_REQUEST_TIMEOUT_SECONDS`, `LECTERN_DEFAULT_VOICE`,
    /// `LECTERN_SMART_VOICE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let api_key =
            env::var("GEMINI_API_KEY").map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY"))?;

        let mut config = Self::new(api_key);

        if let Ok(base_url) = env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("LECTERN_CLASSIFY_MODEL") {
            config.classify_model = model;
        }
        if let Ok(model) = env::var("LECTERN_TTS_MODEL") {
            config.tts_model = model;
        }
        if let Ok(timeout) = env::var("LECTERN_REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout_seconds =
                timeout
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidVar {
                        var: "LECTERN_REQUEST_TIMEOUT_SECONDS",
                        message: e.to_string(),
                    })?;
        }
        if let Ok(voice) = env::var("LECTERN_DEFAULT_VOICE") {
            config.default_voice =
                VoiceName::from_id(&voice).ok_or_else(|| ConfigError::InvalidVar {
                    var: "LECTERN_DEFAULT_VOICE",
                    message: format!("unknown voice '{voice}'"),
                })?;
        }
        if let Ok(smart) = env::var("LECTERN_SMART_VOICE") {
            config.smart_voice = matches!(smart.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "GEMINI_API_KEY",
            "GEMINI_BASE_URL",
            "LECTERN_CLASSIFY_MODEL",
            "LECTERN_TTS_MODEL",
            "LECTERN_REQUEST_TIMEOUT_SECONDS",
            "LECTERN_DEFAULT_VOICE",
            "LECTERN_SMART_VOICE",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_api_key() {
        clear_env();
        assert!(matches!(
            ReaderConfig::from_env(),
            Err(ConfigError::MissingVar("GEMINI_API_KEY"))
        ));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        env::set_var("GEMINI_API_KEY", "test-key");
        let config = ReaderConfig::from_env().unwrap();
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, GEMINI_BASE_URL);
        assert_eq!(config.classify_model, DEFAULT_CLASSIFY_MODEL);
        assert_eq!(config.tts_model, DEFAULT_TTS_MODEL);
        assert_eq!(config.request_timeout_seconds, 60);
        assert_eq!(config.default_voice, DEFAULT_VOICE);
        assert!(config.smart_voice);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("GEMINI_API_KEY", "test-key");
        env::set_var("GEMINI_BASE_URL", "http://localhost:9999/v1beta");
        env::set_var("LECTERN_TTS_MODEL", "custom-tts");
        env::set_var("LECTERN_REQUEST_TIMEOUT_SECONDS", "15");
        env::set_var("LECTERN_DEFAULT_VOICE", "kore");
        env::set_var("LECTERN_SMART_VOICE", "false");
        let config = ReaderConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:9999/v1beta");
        assert_eq!(config.tts_model, "custom-tts");
        assert_eq!(config.request_timeout_seconds, 15);
        assert_eq!(config.default_voice, VoiceName::Kore);
        assert!(!config.smart_voice);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_voice_is_rejected() {
        clear_env();
        env::set_var("GEMINI_API_KEY", "test-key");
        env::set_var("LECTERN_DEFAULT_VOICE", "nosuchvoice");
        assert!(matches!(
            ReaderConfig::from_env(),
            Err(ConfigError::InvalidVar {
                var: "LECTERN_DEFAULT_VOICE",
                ..
            })
        ));
        clear_env();
    }
}
