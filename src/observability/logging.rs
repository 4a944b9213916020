//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Filter used when nothing is configured.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Filter used with `--verbose`.
pub const VERBOSE_LOG_LEVEL: &str = "searchdeck=debug,info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown log format `{other}` (expected pretty or json)"
            ))),
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Resolves settings. `RUST_LOG` wins over the configured level, and
    /// `verbose` wins over both.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let level = if verbose {
            VERBOSE_LOG_LEVEL.to_string()
        } else {
            std::env::var("RUST_LOG")
                .ok()
                .filter(|v| !v.is_empty())
                .or_else(|| settings.and_then(|s| s.level.clone()))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
        };
        let filter = EnvFilter::try_new(&level).unwrap_or_else(|e| {
            tracing::warn!(level = %level, error = %e, "invalid log filter, using default");
            EnvFilter::new(DEFAULT_LOG_LEVEL)
        });

        let format = settings
            .and_then(|s| s.format.as_deref())
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();

        Self {
            filter,
            format,
            file: settings.and_then(|s| s.file.clone()),
        }
    }
}
