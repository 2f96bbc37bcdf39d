use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capture::CaptureSettings;
use crate::error::ConfigError;
use crate::magnifier::MagnifierConfig;
use crate::stream::{DEFAULT_PLACEHOLDER, QuestionMode};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "snip_ask.json";

/// Environment variable overriding [`AppConfig::api_base_url`].
pub const API_URL_ENV: &str = "SNIP_ASK_API_URL";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Application settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub mode: QuestionMode,
    /// Text shown in an answer until its first content arrives
    pub placeholder_text: String,
    pub capture: CaptureSettings,
    pub magnifier: MagnifierConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            mode: QuestionMode::default(),
            placeholder_text: DEFAULT_PLACEHOLDER.to_owned(),
            capture: CaptureSettings::default(),
            magnifier: MagnifierConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load settings from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_env(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply the value of [`API_URL_ENV`], if set and non-empty.
    pub fn apply_env(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|url| !url.trim().is_empty()) {
            log::debug!("{} overrides api base url: {}", API_URL_ENV, url);
            self.api_base_url = url;
        }
    }

    pub fn chat_endpoint(&self) -> String {
        format!("{}/chat/stream", self.api_base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magnifier::MagnifierVariant;

    #[test]
    fn empty_file_means_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.capture.jpeg_quality, 90);
        assert_eq!(config.magnifier.size, 140);
        assert_eq!(config.chat_endpoint(), "http://localhost:8000/api/chat/stream");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"mode":"pdf","magnifier":{"variant":"live"},"capture":{"jpeg_quality":75}}"#,
        )
        .unwrap();
        assert_eq!(config.mode, QuestionMode::Pdf);
        assert_eq!(config.magnifier.variant, MagnifierVariant::Live);
        assert_eq!(config.magnifier.zoom, 3.0);
        assert_eq!(config.capture.jpeg_quality, 75);
        assert_eq!(config.capture.history_limit, 64);
    }

    #[test]
    fn env_override_wins_unless_blank() {
        let mut config = AppConfig::default();
        config.apply_env(Some("  ".into()));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);

        config.apply_env(Some("https://answers.example/api/".into()));
        assert_eq!(config.chat_endpoint(), "https://answers.example/api/chat/stream");
    }

    #[test]
    fn load_reports_bad_files() {
        let dir = std::env::temp_dir().join(format!("snip_ask_config_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(ConfigError::Parse(_))));
        assert!(matches!(
            AppConfig::from_file(&dir.join("missing.json")),
            Err(ConfigError::Read(_))
        ));

        fs::write(&path, r#"{"api_base_url":"http://10.0.0.2:9000/api"}"#).unwrap();
        assert_eq!(AppConfig::from_file(&path).unwrap().api_base_url, "http://10.0.0.2:9000/api");

        fs::remove_dir_all(&dir).unwrap();
    }
}
