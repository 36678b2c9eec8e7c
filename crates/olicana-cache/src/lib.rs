//! Local persistence for fetched climate observations.
//!
//! [`ClimateCache`] keeps per-entity daily observations in SQLite and answers
//! whether a requested date range is already held, allowing for the delay
//! with which upstream sources publish recent days. [`SearchHistory`] keeps
//! the most recent distinct searches in a small JSON file.

pub mod coverage;
pub mod dates;
pub mod error;
pub mod history;
pub mod store;

#[cfg(test)]
mod tests;

pub use self::coverage::{Clock, DateRange, FixedClock, SystemClock};
pub use self::error::{CacheError, HistoryError};
pub use self::history::{HistoryEntry, SearchHistory};
pub use self::store::{ClimateCache, Coordinates, DailyRecord, EntityId};
