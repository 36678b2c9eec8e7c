//! Shared configuration for the Olicana climate plugins.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file, then `OLICANA_*` environment variables, then command
//! line flags. Both plugin binaries load the same [`Config`] so cache and
//! logging behaviour stay consistent between them.

mod defaults;
mod logging;
pub mod telemetry;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HISTORY_FILE, DEFAULT_LOG_FILTER, DEFAULT_SOURCE_LAG_DAYS, default_cache_dir,
    default_history_file, default_log_filter, default_log_filter_string, default_log_format,
    default_source_lag_days,
};
pub use logging::LogFormat;
pub use ortho_config::{OrthoConfig, OrthoError};

/// Runtime configuration shared by the plugin binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "OLICANA")]
pub struct Config {
    /// Directory holding the cache databases and the search history.
    #[serde(default = "default_cache_dir")]
    #[ortho_config(default = default_cache_dir())]
    pub cache_dir: Utf8PathBuf,
    /// Search history file, resolved against [`Config::cache_dir`] when
    /// relative.
    #[serde(default = "default_history_file")]
    #[ortho_config(default = default_history_file())]
    pub history_file: Utf8PathBuf,
    /// Days of upstream publication delay tolerated by coverage checks.
    #[serde(default = "default_source_lag_days")]
    #[ortho_config(default = DEFAULT_SOURCE_LAG_DAYS)]
    pub source_lag_days: u16,
    /// `tracing_subscriber::EnvFilter` expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for diagnostic logs on stderr.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            history_file: default_history_file(),
            source_lag_days: DEFAULT_SOURCE_LAG_DAYS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Directory holding the cache databases.
    #[must_use]
    pub fn cache_dir(&self) -> &Utf8Path {
        &self.cache_dir
    }

    /// Path of a database file inside the cache directory.
    #[must_use]
    pub fn database_path(&self, file_name: &str) -> Utf8PathBuf {
        self.cache_dir.join(file_name)
    }

    /// Search history location.
    ///
    /// Absolute paths are returned unchanged; relative ones are joined onto
    /// the cache directory.
    #[must_use]
    pub fn history_path(&self) -> Utf8PathBuf {
        self.cache_dir.join(&self.history_file)
    }

    /// Tolerated publication delay in days.
    #[must_use]
    pub const fn source_lag_days(&self) -> u16 {
        self.source_lag_days
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests;
