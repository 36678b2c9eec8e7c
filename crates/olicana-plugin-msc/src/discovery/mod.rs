//! Two-step station discovery.
//!
//! Step 1 asks for a map location and a date range and searches for stations
//! with daily data nearby. Step 2 offers the verified stations and loads the
//! chosen one's observations, cache first. A failed load sends the host back
//! to step 1.

use olicana_cache::dates::{format_date, parse_date};
use olicana_cache::{CacheError, ClimateCache, Coordinates, DailyRecord, DateRange};
use olicana_plugins::{FetchError, FormSpec, LogSink, Step, Transition, Workflow};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use time::{Date, Duration};
use tracing::debug;

use crate::source::{Station, StationSource};

const DISCOVERY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::discovery");

/// Location offered when the dialog opens.
pub const DEFAULT_LOCATION: Coordinates = Coordinates::new(51.0447, -114.0719);

/// Days between the default start date and today.
const DEFAULT_START_OFFSET_DAYS: i64 = 395;

/// Days between the default end date and today.
const DEFAULT_END_OFFSET_DAYS: i64 = 30;

const SEARCH_STEP: Step = Step::FIRST;

/// Station chosen by a successful discovery, with its observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    station: Station,
    range: DateRange,
    observations: Vec<DailyRecord>,
}

impl Selection {
    /// Creates a selection.
    #[must_use]
    pub const fn new(station: Station, range: DateRange, observations: Vec<DailyRecord>) -> Self {
        Self {
            station,
            range,
            observations,
        }
    }

    /// Selected station.
    #[must_use]
    pub const fn station(&self) -> &Station {
        &self.station
    }

    /// Requested date range.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        self.range
    }

    /// Days with at least one observed temperature, in date order.
    #[must_use]
    pub fn observations(&self) -> &[DailyRecord] {
        &self.observations
    }
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchInput {
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

/// [`Workflow`] that finds a station and loads its daily observations.
pub struct DiscoveryWorkflow<'a, S> {
    cache: &'a mut ClimateCache,
    source: &'a S,
    location: Coordinates,
    range: DateRange,
    stations: Vec<Station>,
}

impl<'a, S: StationSource> DiscoveryWorkflow<'a, S> {
    /// Prepares the dialog with the default location and range.
    pub fn new(cache: &'a mut ClimateCache, source: &'a S) -> Self {
        let today = cache.today();
        let days_ago = |days| today.checked_sub(Duration::days(days)).unwrap_or(Date::MIN);
        let range = DateRange::new(
            days_ago(DEFAULT_START_OFFSET_DAYS),
            days_ago(DEFAULT_END_OFFSET_DAYS),
        );
        Self {
            cache,
            source,
            location: DEFAULT_LOCATION,
            range,
            stations: Vec::new(),
        }
    }

    /// Stations verified by the last search.
    #[must_use]
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Currently selected location.
    #[must_use]
    pub const fn location(&self) -> Coordinates {
        self.location
    }

    /// Currently selected date range.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        self.range
    }

    fn search_form(&self) -> FormSpec {
        let schema = json!({
            "type": "object",
            "title": "MSC Climate Discovery",
            "required": ["location", "startDate", "endDate"],
            "properties": {
                "location": {
                    "type": "object",
                    "title": "1. Pick a location on the map",
                    "properties": {"lat": {"type": "number"}, "lng": {"type": "number"}},
                },
                "startDate": {"type": "string", "title": "2. Start Date", "format": "date"},
                "endDate": {"type": "string", "title": "3. End Date", "format": "date"},
            },
        });
        let ui_schema = json!({
            "ui:order": ["location", "startDate", "endDate"],
            "location": {"ui:widget": "map-picker"},
            "startDate": {"ui:widget": "date"},
            "endDate": {"ui:widget": "date"},
        });
        let data = json!({
            "location": {"lat": self.location.lat(), "lng": self.location.lng()},
            "startDate": format_date(self.range.start()),
            "endDate": format_date(self.range.end()),
        });
        FormSpec::new("MSC Climate Discovery - Step 1/2", schema, ui_schema).with_data(data)
    }

    fn selection_form(&self) -> FormSpec {
        let choices: Vec<Value> = self
            .stations
            .iter()
            .map(|station| json!({"const": station.climate_id, "title": station.label()}))
            .collect();
        let schema = json!({
            "type": "object",
            "title": format!("Discovery Results: {} stations verified", self.stations.len()),
            "required": ["station"],
            "properties": {
                "station": {
                    "type": "string",
                    "title": "4. Select verified station",
                    "oneOf": choices,
                },
            },
        });
        let first = self
            .stations
            .first()
            .map(|station| station.climate_id.as_str())
            .unwrap_or_default();
        FormSpec::new(
            "MSC Climate Discovery - Step 2/2",
            schema,
            json!({"station": {"ui:widget": "select"}}),
        )
        .with_data(json!({"station": first}))
    }

    fn read_search(&mut self, input: Value) -> Result<(), String> {
        let form = serde_json::from_value::<SearchInput>(input)
            .map_err(|err| format!("Invalid form data: {err}"))?;
        let parse = |text: Option<&str>, fallback: Date| match text {
            Some(raw) => parse_date(raw).map_err(|_| format!("Invalid date: {raw}")),
            None => Ok(fallback),
        };
        let start = parse(form.start_date.as_deref(), self.range.start())?;
        let end = parse(form.end_date.as_deref(), self.range.end())?;
        if start > end {
            return Err(String::from("Start date must be before end date."));
        }
        if let Some(picked) = form.location {
            self.location = Coordinates::new(picked.lat, picked.lng);
        }
        self.range = DateRange::new(start, end);
        Ok(())
    }

    fn search(&mut self, input: Value, log: &mut dyn LogSink) -> Transition<Selection> {
        if let Err(message) = self.read_search(input) {
            return Transition::retry(message);
        }
        let at = self.location;
        log.info(&format!("Verifying stations near {}, {}...", at.lat(), at.lng()));
        match self.source.stations_near(at, self.range) {
            Ok(found) if found.is_empty() => {
                let message = format!(
                    "No stations found with daily data near {:.2}, {:.2} for that period. \
                     Please try another location or date range.",
                    at.lat(),
                    at.lng()
                );
                log.warn(&message);
                Transition::retry(message)
            }
            Ok(found) => {
                debug!(target: DISCOVERY_TARGET, stations = found.len(), "stations verified");
                self.stations = found;
                Transition::Advance
            }
            Err(err) => Transition::retry(format!("Discovery search failed: {err}")),
        }
    }

    fn select(&mut self, input: &Value, log: &mut dyn LogSink) -> Transition<Selection> {
        let chosen = input.get("station").and_then(Value::as_str);
        let Some(station) = chosen
            .and_then(|id| self.stations.iter().find(|station| station.climate_id == id))
            .cloned()
        else {
            return Transition::regress(SEARCH_STEP, "Selection lost. Please try again.");
        };

        log.info(&format!("Selected {}. Fetching full data set...", station.name));
        let observations = match self.load(&station, log) {
            Ok(rows) => rows,
            Err(err) => {
                return Transition::regress(SEARCH_STEP, format!("Final data fetch failed: {err}"));
            }
        };
        if observations.is_empty() {
            return Transition::regress(
                SEARCH_STEP,
                "Station verification failed: no actual observations returned.",
            );
        }

        log.info(&format!("Loaded {} daily observations", observations.len()));
        Transition::Succeed(Selection::new(station, self.range, observations))
    }

    /// Reads the station's observations, fetching and merging when the cache
    /// does not cover the range.
    fn load(
        &mut self,
        station: &Station,
        log: &mut dyn LogSink,
    ) -> Result<Vec<DailyRecord>, LoadError> {
        let id = station.climate_id.as_str();
        self.cache.upsert_entity(id, station.location)?;
        if self.cache.is_covered(id, self.range)? {
            log.info(&format!("Using cached observations for {}", station.name));
        } else {
            let fetched = self
                .source
                .daily_observations(id, self.range)?;
            if !fetched.is_empty() {
                self.cache.merge(id, &fetched)?;
            }
        }
        let rows = self.cache.fetch(id, self.range)?;
        Ok(rows.into_iter().filter(is_observed).collect())
    }
}

#[derive(Debug, Error)]
enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

const fn is_observed(record: &DailyRecord) -> bool {
    record.tmean.is_some() || record.tmin.is_some() || record.tmax.is_some()
}

impl<S: StationSource> Workflow for DiscoveryWorkflow<'_, S> {
    type Output = Selection;

    fn step_count(&self) -> usize {
        2
    }

    fn form(&self, step: Step) -> FormSpec {
        if step == SEARCH_STEP {
            self.search_form()
        } else {
            self.selection_form()
        }
    }

    fn submit(&mut self, step: Step, input: Value, log: &mut dyn LogSink) -> Transition<Selection> {
        if step == SEARCH_STEP {
            self.search(input, log)
        } else {
            self.select(&input, log)
        }
    }

    fn cancelled(&mut self, log: &mut dyn LogSink) {
        log.info("Discovery cancelled");
    }
}
