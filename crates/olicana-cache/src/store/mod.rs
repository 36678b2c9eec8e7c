//! SQLite-backed observation store.
//!
//! Entities are registered once by name and keep their identifier for the
//! lifetime of the database; registering an existing name only refreshes its
//! coordinates. Observations are keyed by `(entity, day)` and merging the
//! same day again overwrites its values, so repeated merges are idempotent.

use std::fs;

use camino::Utf8Path;
use rusqlite::{Connection, OptionalExtension, params};
use time::{Date, Duration};
use tracing::{debug, info};

use crate::coverage::{Clock, DateRange, SystemClock};
use crate::error::CacheError;

/// Tracing target for cache operations.
const CACHE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

/// Publication delay assumed when none is configured.
pub const DEFAULT_SOURCE_LAG_DAYS: u16 = 7;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS entities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        lat REAL NOT NULL,
        lng REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS observations (
        entity_id INTEGER NOT NULL REFERENCES entities(id),
        day INTEGER NOT NULL,
        tmean REAL,
        tmin REAL,
        tmax REAL,
        PRIMARY KEY (entity_id, day)
    ) WITHOUT ROWID;
";

/// Stable identifier of a registered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(i64);

impl EntityId {
    /// Returns the raw database identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

/// Latitude and longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the latitude.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Returns the longitude.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }
}

/// Temperatures observed on one day. Any field may be missing upstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyRecord {
    /// Calendar day.
    pub date: Date,
    /// Mean temperature in °C.
    pub tmean: Option<f64>,
    /// Minimum temperature in °C.
    pub tmin: Option<f64>,
    /// Maximum temperature in °C.
    pub tmax: Option<f64>,
}

/// Range-aware cache of daily observations.
#[derive(Debug)]
pub struct ClimateCache {
    conn: Connection,
    clock: Box<dyn Clock>,
    source_lag: Duration,
}

impl ClimateCache {
    /// Opens or creates the database at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created.
    pub fn open(path: &Utf8Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
                path: parent.to_path_buf(),
                source: source.into(),
            })?;
        }
        let conn = Connection::open(path).map_err(|err| CacheError::database("open", err))?;
        info!(target: CACHE_TARGET, %path, "opened climate cache");
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot initialise the schema.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn =
            Connection::open_in_memory().map_err(|err| CacheError::database("open", err))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA)
            .map_err(|err| CacheError::database("schema setup", err))?;
        Ok(Self {
            conn,
            clock: Box::new(SystemClock),
            source_lag: Duration::days(i64::from(DEFAULT_SOURCE_LAG_DAYS)),
        })
    }

    /// Replaces the clock used to decide what "today" is.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Sets the number of recent days the upstream source may not have
    /// published yet.
    #[must_use]
    pub fn with_source_lag(mut self, days: u16) -> Self {
        self.source_lag = Duration::days(i64::from(days));
        self
    }

    /// Returns the configured publication delay.
    #[must_use]
    pub const fn source_lag(&self) -> Duration {
        self.source_lag
    }

    /// Returns today's date according to the cache's clock.
    #[must_use]
    pub fn today(&self) -> Date {
        self.clock.today()
    }

    /// Registers `name`, or refreshes its coordinates if already known.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn upsert_entity(&self, name: &str, at: Coordinates) -> Result<EntityId, CacheError> {
        let id = self
            .conn
            .query_row(
                "INSERT INTO entities (name, lat, lng) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET lat = excluded.lat, lng = excluded.lng
                 RETURNING id",
                params![name, at.lat, at.lng],
                |row| row.get(0),
            )
            .map_err(|err| CacheError::database("entity upsert", err))?;
        debug!(target: CACHE_TARGET, name, id, "registered entity");
        Ok(EntityId(id))
    }

    /// Returns the stored coordinates of `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn location(&self, name: &str) -> Result<Option<Coordinates>, CacheError> {
        self.conn
            .query_row(
                "SELECT lat, lng FROM entities WHERE name = ?1",
                params![name],
                |row| Ok(Coordinates::new(row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|err| CacheError::database("location lookup", err))
    }

    fn entity_id(&self, name: &str) -> Result<Option<EntityId>, CacheError> {
        self.conn
            .query_row(
                "SELECT id FROM entities WHERE name = ?1",
                params![name],
                |row| row.get(0).map(EntityId),
            )
            .optional()
            .map_err(|err| CacheError::database("entity lookup", err))
    }

    /// Returns whether every publishable day of `range` is held for `name`.
    ///
    /// Unknown entities and entities without observations are never covered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails or holds an invalid day.
    pub fn is_covered(&self, name: &str, range: DateRange) -> Result<bool, CacheError> {
        let Some(id) = self.entity_id(name)? else {
            return Ok(false);
        };
        let bounds: (Option<i32>, Option<i32>) = self
            .conn
            .query_row(
                "SELECT MIN(day), MAX(day) FROM observations WHERE entity_id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|err| CacheError::database("coverage query", err))?;
        let (Some(first), Some(last)) = bounds else {
            return Ok(false);
        };
        let held = DateRange::new(from_day(first)?, from_day(last)?);
        let covered = range.is_covered_by(held, self.today(), self.source_lag);
        debug!(target: CACHE_TARGET, name, %range, %held, covered, "coverage check");
        Ok(covered)
    }

    /// Returns the observations of `name` within `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails or holds an invalid day.
    pub fn fetch(&self, name: &str, range: DateRange) -> Result<Vec<DailyRecord>, CacheError> {
        let Some(id) = self.entity_id(name)? else {
            return Ok(Vec::new());
        };
        let mut statement = self
            .conn
            .prepare_cached(
                "SELECT day, tmean, tmin, tmax FROM observations
                 WHERE entity_id = ?1 AND day BETWEEN ?2 AND ?3
                 ORDER BY day",
            )
            .map_err(|err| CacheError::database("fetch", err))?;
        let rows = statement
            .query_map(
                params![
                    id.0,
                    range.start().to_julian_day(),
                    range.end().to_julian_day()
                ],
                |row| {
                    Ok((
                        row.get::<_, i32>(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                    ))
                },
            )
            .map_err(|err| CacheError::database("fetch", err))?;

        rows.map(|row| {
            let (day, tmean, tmin, tmax) = row.map_err(|err| CacheError::database("fetch", err))?;
            Ok(DailyRecord {
                date: from_day(day)?,
                tmean,
                tmin,
                tmax,
            })
        })
        .collect()
    }

    /// Stores `records` for `name`, overwriting days already held.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownEntity`] if `name` was never registered,
    /// or an error if the database write fails. A failed merge leaves the
    /// store unchanged.
    pub fn merge(&mut self, name: &str, records: &[DailyRecord]) -> Result<usize, CacheError> {
        let id = self
            .entity_id(name)?
            .ok_or_else(|| CacheError::UnknownEntity {
                name: name.to_owned(),
            })?;
        let tx = self
            .conn
            .transaction()
            .map_err(|err| CacheError::database("merge", err))?;
        {
            let mut statement = tx
                .prepare_cached(
                    "INSERT INTO observations (entity_id, day, tmean, tmin, tmax)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(entity_id, day) DO UPDATE SET
                        tmean = excluded.tmean,
                        tmin = excluded.tmin,
                        tmax = excluded.tmax",
                )
                .map_err(|err| CacheError::database("merge", err))?;
            for record in records {
                statement
                    .execute(params![
                        id.0,
                        record.date.to_julian_day(),
                        record.tmean,
                        record.tmin,
                        record.tmax
                    ])
                    .map_err(|err| CacheError::database("merge", err))?;
            }
        }
        tx.commit()
            .map_err(|err| CacheError::database("merge", err))?;
        debug!(target: CACHE_TARGET, name, count = records.len(), "merged observations");
        Ok(records.len())
    }
}

fn from_day(day: i32) -> Result<Date, CacheError> {
    Date::from_julian_day(day).map_err(|_| CacheError::InvalidDay { day })
}

#[cfg(test)]
mod tests;
