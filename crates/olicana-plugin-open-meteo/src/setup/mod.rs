//! The setup dialog: pick cities, a date range and a data mode.
//!
//! The form is live. Choosing a past search fills in its cities and dates,
//! and editing the city list re-resolves the map markers, cache first and
//! geocoder second. Submission loads every city, cache first, and records
//! the search in the history.

use std::collections::HashMap;

use olicana_cache::dates::{format_date, parse_date};
use olicana_cache::{
    CacheError, ClimateCache, Coordinates, DailyRecord, DateRange, HistoryEntry, SearchHistory,
};
use olicana_plugins::{FormSpec, FormUpdate, LogSink, Preview, Step, Transition, Workflow};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use time::{Date, Duration};
use tracing::{debug, warn};

use crate::aggregate::DataMode;
use crate::schema::{FORM_TITLE, NEW_SEARCH, Presets, build_schema};
use crate::source::ClimateSource;

const SETUP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::setup");

/// City offered when the form first opens.
pub const DEFAULT_CITY: &str = "Calgary";

/// Length of the default date range: thirty years of 365 days.
const DEFAULT_SPAN_DAYS: i64 = 10_950;

/// Observations loaded by a successful setup.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    cities: Vec<String>,
    range: DateRange,
    mode: DataMode,
    records: HashMap<String, Vec<DailyRecord>>,
}

impl Dataset {
    /// Creates a dataset from per-city observations.
    #[must_use]
    pub const fn new(
        cities: Vec<String>,
        range: DateRange,
        mode: DataMode,
        records: HashMap<String, Vec<DailyRecord>>,
    ) -> Self {
        Self {
            cities,
            range,
            mode,
            records,
        }
    }

    /// Requested cities in submission order, whether or not data was found.
    #[must_use]
    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// Requested date range.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        self.range
    }

    /// Selected data mode.
    #[must_use]
    pub const fn mode(&self) -> DataMode {
        self.mode
    }

    /// Observations for `city`, if any were loaded.
    #[must_use]
    pub fn records(&self, city: &str) -> Option<&[DailyRecord]> {
        self.records.get(city).map(Vec::as_slice)
    }

    /// Number of cities with observations.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.records.len()
    }
}

#[derive(Debug, Default, Deserialize)]
struct SetupInput {
    #[serde(default)]
    cities: Vec<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    mode: Option<String>,
}

/// One-step [`Workflow`] configuring the Open-Meteo plugin.
pub struct SetupWorkflow<'a, S> {
    cache: &'a mut ClimateCache,
    source: &'a S,
    history: &'a SearchHistory,
    presets: Presets,
    today: Date,
    default_range: DateRange,
    values: Value,
    last_search: String,
    last_cities: Vec<String>,
}

impl<'a, S: ClimateSource> SetupWorkflow<'a, S> {
    /// Prepares the dialog, resolving markers for the default city.
    pub fn new(cache: &'a mut ClimateCache, source: &'a S, history: &'a SearchHistory) -> Self {
        let today = cache.today();
        let start = today
            .checked_sub(Duration::days(DEFAULT_SPAN_DAYS))
            .unwrap_or(Date::MIN);
        let default_range = DateRange::new(start, today);
        let cities = vec![String::from(DEFAULT_CITY)];
        let mut workflow = Self {
            cache,
            source,
            history,
            presets: Presets::from_history(history.entries()),
            today,
            default_range,
            values: json!({
                "search_type": NEW_SEARCH,
                "cities": &cities,
                "start_date": format_date(start),
                "end_date": format_date(today),
                "map_markers": [],
                "mode": DataMode::Daily.to_string(),
            }),
            last_search: String::from(NEW_SEARCH),
            last_cities: cities.clone(),
        };
        let markers = workflow.markers(&cities);
        set_field(&mut workflow.values, "map_markers", markers);
        workflow
    }

    /// Current form values.
    #[must_use]
    pub const fn values(&self) -> &Value {
        &self.values
    }

    fn locate(&mut self, city: &str) -> Option<Coordinates> {
        match self.cache.location(city) {
            Ok(Some(known)) => return Some(known),
            Ok(None) => {}
            Err(err) => {
                warn!(target: SETUP_TARGET, city, error = %err, "cache lookup failed");
            }
        }
        match self.source.geocode(city) {
            Ok(found) => {
                if let Err(err) = self.cache.upsert_entity(city, found) {
                    warn!(target: SETUP_TARGET, city, error = %err, "failed to remember location");
                }
                Some(found)
            }
            Err(err) => {
                debug!(target: SETUP_TARGET, city, error = %err, "geocoding failed");
                None
            }
        }
    }

    fn markers(&mut self, cities: &[String]) -> Value {
        let mut markers = Vec::new();
        for city in cities.iter().map(|city| city.trim()).filter(|city| !city.is_empty()) {
            if let Some(at) = self.locate(city) {
                markers.push(json!({ "lat": at.lat(), "lng": at.lng(), "popup": city }));
            }
        }
        Value::Array(markers)
    }

    fn load_city(
        &mut self,
        city: &str,
        range: DateRange,
        log: &mut dyn LogSink,
    ) -> Result<Option<Vec<DailyRecord>>, String> {
        let cache_failure = |err: CacheError| format!("Cache failure for {city}: {err}");

        if self.cache.is_covered(city, range).map_err(cache_failure)? {
            log.info(&format!("Using cached data for {city}"));
            return self.cache.fetch(city, range).map(Some).map_err(cache_failure);
        }

        log.info(&format!("Geocoding {city}..."));
        let at = self
            .locate(city)
            .ok_or_else(|| format!("Could not calculate coordinates for {city}"))?;

        log.info(&format!("Fetching open-meteo for {city}..."));
        let fetched = self
            .source
            .daily_archive(at, range.clamp_end(self.today))
            .map_err(|err| format!("Failed fetching {city}: {err}"))?;
        if fetched.is_empty() {
            log.warn(&format!("No data returned for {city}"));
            return Ok(None);
        }

        self.cache.merge(city, &fetched).map_err(cache_failure)?;
        self.cache.fetch(city, range).map(Some).map_err(cache_failure)
    }

    fn parse_range(&self, input: &SetupInput) -> Result<DateRange, String> {
        let parse = |text: Option<&str>, fallback: Date| match text {
            Some(raw) => parse_date(raw).map_err(|_| format!("Invalid date: {raw}")),
            None => Ok(fallback),
        };
        let start = parse(input.start_date.as_deref(), self.default_range.start())?;
        let end = parse(input.end_date.as_deref(), self.default_range.end())?;
        if start >= end {
            return Err(String::from("Start date must be before end date."));
        }
        Ok(DateRange::new(start, end))
    }

    fn validate(&self, input: &SetupInput) -> Result<(Vec<String>, DateRange, DataMode), String> {
        let range = self.parse_range(input)?;
        let cities: Vec<String> = input
            .cities
            .iter()
            .map(|city| city.trim())
            .filter(|city| !city.is_empty())
            .map(str::to_owned)
            .collect();
        if cities.is_empty() {
            return Err(String::from("At least one valid city is required."));
        }
        let mode = match input.mode.as_deref() {
            Some(label) => label
                .parse()
                .map_err(|_| format!("Unknown data mode: {label}"))?,
            None => DataMode::default(),
        };
        Ok((cities, range, mode))
    }
}

impl<S: ClimateSource> Workflow for SetupWorkflow<'_, S> {
    type Output = Dataset;

    fn step_count(&self) -> usize {
        1
    }

    fn form(&self, _step: Step) -> FormSpec {
        let (schema, ui_schema) = build_schema(&self.presets, self.today);
        FormSpec::new(FORM_TITLE, schema, ui_schema)
            .with_data(self.values.clone())
            .with_form_change()
    }

    fn submit(&mut self, _step: Step, input: Value, log: &mut dyn LogSink) -> Transition<Dataset> {
        let parsed = serde_json::from_value::<SetupInput>(input.clone());
        self.values = input;
        let form = match parsed {
            Ok(form) => form,
            Err(err) => return Transition::retry(format!("Invalid form data: {err}")),
        };
        let (cities, range, mode) = match self.validate(&form) {
            Ok(valid) => valid,
            Err(message) => return Transition::retry(message),
        };

        log.info(&format!("Processing: {}", cities.join(", ")));
        let mut records = HashMap::new();
        for city in &cities {
            match self.load_city(city, range, log) {
                Ok(Some(rows)) => {
                    records.insert(city.clone(), rows);
                }
                Ok(None) => {}
                Err(message) => return Transition::retry(message),
            }
        }

        let entry = HistoryEntry {
            cities: cities.clone(),
            start_date: range.start(),
            end_date: range.end(),
        };
        if let Err(err) = self.history.record(entry) {
            warn!(target: SETUP_TARGET, error = %err, "failed to record search history");
        }

        let dataset = Dataset::new(cities, range, mode, records);
        log.info(&format!("Loaded data for {} cities.", dataset.loaded()));
        Transition::Succeed(dataset)
    }

    fn form_change(&mut self, _step: Step, mut data: Value, _log: &mut dyn LogSink) -> Preview {
        let search = data
            .get("search_type")
            .and_then(Value::as_str)
            .unwrap_or(NEW_SEARCH)
            .to_owned();
        let mut cities = string_list(data.get("cities"));
        let mut changed = false;

        if search != self.last_search {
            if let Some(entry) = self.presets.search(&search).cloned() {
                set_field(&mut data, "cities", json!(entry.cities));
                set_field(&mut data, "start_date", json!(format_date(entry.start_date)));
                set_field(&mut data, "end_date", json!(format_date(entry.end_date)));
                cities = entry.cities;
                changed = true;
            }
            self.last_search = search;
        }

        if cities != self.last_cities {
            let markers = self.markers(&cities);
            set_field(&mut data, "map_markers", markers);
            self.last_cities = cities;
            changed = true;
        }

        self.values = data.clone();
        if changed {
            Preview::Updated(FormUpdate::new(data))
        } else {
            Preview::Unchanged
        }
    }

    fn cancelled(&mut self, log: &mut dyn LogSink) {
        log.info("Configuration cancelled");
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn set_field(target: &mut Value, key: &str, value: Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Some(object) = target.as_object_mut() {
        object.insert(key.to_owned(), value);
    }
}
