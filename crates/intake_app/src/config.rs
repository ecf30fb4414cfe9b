use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use intake_engine::{TransportSettings, DEFAULT_BASE_URL, DEFAULT_CONTEXT_WINDOW};
use serde::{Deserialize, Serialize};

use crate::logging::{LogDestination, LogLevel};

pub const DEFAULT_CONFIG_PATH: &str = "intake.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Settings read from `intake.ron`; every field is optional in the file.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub context_window: u32,
    pub log_destination: LogDestination,
    pub log_level: LogLevel,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            context_window: DEFAULT_CONTEXT_WINDOW,
            log_destination: LogDestination::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl fmt::Debug for IntakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntakeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("context_window", &self.context_window)
            .field("log_destination", &self.log_destination)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl IntakeConfig {
    /// Read `path`; `None` when there is no file.
    ///
    /// Runs before the logger exists, so nothing is logged here.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        ron::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Command-line and environment values win over the file.
    pub fn apply_overrides(&mut self, base_url: Option<String>, api_key: Option<String>) {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if api_key.is_some() {
            self.api_key = api_key;
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            context_window: self.context_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = IntakeConfig::load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(loaded, None);
        let config = loaded.unwrap_or_default();
        assert_eq!(config.base_url, "http://localhost:8000/api");
    }

    #[test]
    fn partial_file_fills_remaining_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"(base_url: "https://docs.example.com/api", api_key: Some("k-1"), log_level: Debug)"#
        )
        .unwrap();

        let config = IntakeConfig::load(file.path()).unwrap().unwrap();
        assert_eq!(config.base_url, "https://docs.example.com/api");
        assert_eq!(config.api_key.as_deref(), Some("k-1"));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.context_window, DEFAULT_CONTEXT_WINDOW);
        assert_eq!(config.log_destination, LogDestination::File);
    }

    #[test]
    fn logger_settings_come_from_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(log_destination: Terminal, log_level: Warn)").unwrap();

        let config = IntakeConfig::load(file.path()).unwrap().unwrap();
        assert_eq!(config.log_destination, LogDestination::Terminal);
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(base_url: 42").unwrap();

        let err = IntakeConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = IntakeConfig {
            api_key: Some("from-file".into()),
            ..IntakeConfig::default()
        };
        config.apply_overrides(Some("http://10.0.0.5:8000/api".into()), None);
        assert_eq!(config.base_url, "http://10.0.0.5:8000/api");
        assert_eq!(config.api_key.as_deref(), Some("from-file"));

        config.apply_overrides(None, Some("from-env".into()));
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let config = IntakeConfig {
            api_key: Some("top-secret".into()),
            ..IntakeConfig::default()
        };
        assert!(!format!("{config:?}").contains("top-secret"));
    }

    #[test]
    fn transport_settings_use_configured_timeouts() {
        let config = IntakeConfig {
            connect_timeout_secs: 3,
            request_timeout_secs: 90,
            context_window: 2048,
            ..IntakeConfig::default()
        };
        let settings = config.transport_settings();
        assert_eq!(settings.connect_timeout, Duration::from_secs(3));
        assert_eq!(settings.request_timeout, Duration::from_secs(90));
        assert_eq!(settings.context_window, 2048);
    }
}
