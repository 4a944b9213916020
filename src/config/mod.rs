//! Configuration management.
//!
//! Settings come from a TOML file, then environment variables:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `SEARCHDECK_URL` | `instance.url` |
//! | `SEARCHDECK_API_KEY` | `instance.api_key` |
//! | `SEARCHDECK_LOG_LEVEL` | `logging.level` |
//! | `SEARCHDECK_LOG_FORMAT` | `logging.format` |
//! | `SEARCHDECK_DATA_DIR` | `data_dir` |

use crate::collections::DEFAULT_CHUNK_SIZE;
use crate::io::DEFAULT_EXPORT_BATCH_SIZE;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine URL used when nothing is configured.
pub const DEFAULT_URL: &str = "http://localhost:7700";

/// Application directory name under the platform config and data dirs.
pub const APP_DIR: &str = "searchdeck";

/// Main configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Engine connection.
    pub instance: InstanceConfig,
    /// Export and import sizing.
    pub export: ExportConfig,
    /// Task polling.
    pub tasks: TasksConfig,
    /// Logging settings, resolved by [`crate::observability`].
    pub logging: LoggingSettings,
    /// Directory holding the credentials registry.
    pub data_dir: PathBuf,
}

/// Engine connection.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// Base URL.
    pub url: String,
    /// API key sent as a bearer token.
    pub api_key: Option<SecretString>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
        }
    }
}

/// Export and import sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportConfig {
    /// Documents per page when reading an index.
    pub batch_size: usize,
    /// Documents per write request.
    pub chunk_size: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_EXPORT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Task polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TasksConfig {
    /// Time allowed per task.
    pub timeout: Duration,
    /// Delay between status checks.
    pub poll_interval: Duration,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Logging settings as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `searchdeck=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file; stderr when absent.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Instance section.
    pub instance: Option<ConfigFileInstance>,
    /// Export section.
    pub export: Option<ConfigFileExport>,
    /// Tasks section.
    pub tasks: Option<ConfigFileTasks>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Instance section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileInstance {
    /// Base URL.
    pub url: Option<String>,
    /// API key.
    pub api_key: Option<String>,
}

/// Export section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileExport {
    /// Page size.
    pub batch_size: Option<usize>,
    /// Write chunk size.
    pub chunk_size: Option<usize>,
}

/// Tasks section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileTasks {
    /// Timeout per task in seconds.
    pub timeout_secs: Option<u64>,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instance: InstanceConfig::default(),
            export: ExportConfig::default(),
            tasks: TasksConfig::default(),
            logging: LoggingSettings::default(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".searchdeck"),
        |dirs| dirs.data_dir().join(APP_DIR),
    )
}

impl AppConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/searchdeck/`.
    /// Returns defaults if neither holds a readable `config.toml`.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join(APP_DIR).join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join(APP_DIR)
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `AppConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(instance) = file.instance {
            if let Some(url) = instance.url {
                config.instance.url = url;
            }
            config.instance.api_key = instance.api_key.map(SecretString::from);
        }
        if let Some(export) = file.export {
            if let Some(v) = export.batch_size.filter(|v| *v > 0) {
                config.export.batch_size = v;
            }
            if let Some(v) = export.chunk_size.filter(|v| *v > 0) {
                config.export.chunk_size = v;
            }
        }
        if let Some(tasks) = file.tasks {
            if let Some(secs) = tasks.timeout_secs {
                config.tasks.timeout = Duration::from_secs(secs);
            }
            if let Some(ms) = tasks.poll_interval_ms {
                config.tasks.poll_interval = Duration::from_millis(ms);
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Applies `SEARCHDECK_*` environment variables.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`. Empty values are ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get("SEARCHDECK_URL") {
            self.instance.url = url;
        }
        if let Some(key) = get("SEARCHDECK_API_KEY") {
            self.instance.api_key = Some(SecretString::from(key));
        }
        if let Some(level) = get("SEARCHDECK_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(format) = get("SEARCHDECK_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(dir) = get("SEARCHDECK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    /// Sets the instance URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.instance.url = url.into();
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::new();

        assert_eq!(config.instance.url, DEFAULT_URL);
        assert!(config.instance.api_key.is_none());
        assert_eq!(config.export.batch_size, 1000);
        assert_eq!(config.tasks.timeout, Duration::from_secs(3600));
        assert_eq!(config.tasks.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_from_toml() {
        let config = AppConfig::from_toml(
            r#"
            data_dir = "/var/lib/searchdeck"

            [instance]
            url = "https://search.example.com"
            api_key = "masterKey"

            [export]
            batch_size = 250
            chunk_size = 0

            [tasks]
            timeout_secs = 60
            poll_interval_ms = 200

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/searchdeck"));
        assert_eq!(config.instance.url, "https://search.example.com");
        assert_eq!(
            config.instance.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("masterKey".to_string())
        );
        assert_eq!(config.export.batch_size, 250);
        // Zero sizes keep the default.
        assert_eq!(config.export.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.tasks.timeout, Duration::from_secs(60));
        assert_eq!(config.tasks.poll_interval, Duration::from_millis(200));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AppConfig::from_toml("instance = 3").is_err());
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load_from_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SEARCHDECK_URL", "http://10.0.0.1:7700"),
            ("SEARCHDECK_API_KEY", ""),
            ("SEARCHDECK_LOG_LEVEL", "trace"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::new()
            .with_overrides_from(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.instance.url, "http://10.0.0.1:7700");
        assert!(config.instance.api_key.is_none());
        assert_eq!(config.logging.level.as_deref(), Some("trace"));
    }
}
