//! Most-recent-first log of distinct searches.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{debug, warn};

use crate::dates::iso_date;
use crate::error::HistoryError;

/// Tracing target for history operations.
const HISTORY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::history");

/// Number of searches retained.
pub const MAX_ENTRIES: usize = 15;

/// One past search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entity names in the order they were entered.
    pub cities: Vec<String>,
    /// First requested day.
    #[serde(with = "iso_date")]
    pub start_date: Date,
    /// Last requested day.
    #[serde(with = "iso_date")]
    pub end_date: Date,
}

/// Search history persisted as a JSON array.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    path: Utf8PathBuf,
}

impl SearchHistory {
    /// Uses the history file at `path`; the file need not exist.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Reads the stored searches, most recent first.
    ///
    /// A missing or unreadable file reads as an empty history.
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                debug!(target: HISTORY_TARGET, path = %self.path, error = %err, "no search history");
                return Vec::new();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|err| {
            warn!(target: HISTORY_TARGET, path = %self.path, error = %err, "ignoring corrupt search history");
            Vec::new()
        })
    }

    /// Moves `entry` to the front, dropping an identical older entry and
    /// anything beyond [`MAX_ENTRIES`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn record(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self.entries();
        entries.retain(|existing| *existing != entry);
        entries.insert(0, entry);
        entries.truncate(MAX_ENTRIES);

        let text = serde_json::to_string_pretty(&entries).map_err(|source| HistoryError::Encode {
            source: source.into(),
        })?;
        fs::write(&self.path, text).map_err(|source| HistoryError::Write {
            path: self.path.clone(),
            source: source.into(),
        })?;
        debug!(target: HISTORY_TARGET, count = entries.len(), "recorded search");
        Ok(())
    }
}
