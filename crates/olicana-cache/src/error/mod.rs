//! Error types for the cache and the search history.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Failures of the observation store.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The directory holding the database could not be created.
    #[error("failed to create cache directory '{path}': {source}")]
    CreateDir {
        /// Directory path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// An SQLite operation failed.
    #[error("cache {operation} failed: {source}")]
    Database {
        /// Short description of what was attempted.
        operation: &'static str,
        /// Underlying SQLite error.
        #[source]
        source: Arc<rusqlite::Error>,
    },

    /// Observations were merged for an entity that was never registered.
    #[error("cannot store observations for unknown entity '{name}'")]
    UnknownEntity {
        /// Entity name as given.
        name: String,
    },

    /// A stored day number does not map to a calendar date.
    #[error("cached day number {day} is not a valid date")]
    InvalidDay {
        /// Stored Julian day number.
        day: i32,
    },
}

impl CacheError {
    pub(crate) fn database(operation: &'static str, source: rusqlite::Error) -> Self {
        Self::Database {
            operation,
            source: Arc::new(source),
        }
    }
}

/// Failures persisting the search history.
#[derive(Debug, Clone, Error)]
pub enum HistoryError {
    /// The history file could not be written.
    #[error("failed to write search history '{path}': {source}")]
    Write {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The history could not be encoded.
    #[error("failed to encode search history: {source}")]
    Encode {
        /// Underlying serialisation error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}
