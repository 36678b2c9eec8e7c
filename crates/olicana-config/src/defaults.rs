//! Built-in configuration defaults.

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// File name of the search history inside the cache directory.
pub const DEFAULT_HISTORY_FILE: &str = "search_history.json";

/// Days of upstream publication delay tolerated by coverage checks.
pub const DEFAULT_SOURCE_LAG_DAYS: u16 = 7;

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    String::from(DEFAULT_LOG_FILTER)
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Directory holding cache databases, relative to the working directory.
#[must_use]
pub fn default_cache_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

/// Search history file name.
#[must_use]
pub fn default_history_file() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_HISTORY_FILE)
}

/// Tolerated publication delay in days.
#[must_use]
pub const fn default_source_lag_days() -> u16 {
    DEFAULT_SOURCE_LAG_DAYS
}
