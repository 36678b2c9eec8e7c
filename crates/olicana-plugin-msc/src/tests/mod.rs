//! Plugin-level tests and shared fixtures.


use std::io::Cursor;

use camino::Utf8PathBuf;
use mockall::mock;
use olicana_cache::{ClimateCache, Coordinates, DailyRecord, DateRange, FixedClock};
use olicana_config::Config;
use olicana_plugins::chart::CHART_COLORS;
use olicana_plugins::test_support::{ScriptedHost, decode_all, replies, without_logs};
use olicana_plugins::{FetchError, Message, Plugin, PluginError, Session, Storage};
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;
use time::Date;
use time::macros::date;

use crate::discovery::Selection;
use crate::{CACHE_FILE, MscPlugin, PLUGIN_NAME, Station, StationSource, run_with_source};

mock! {
    pub Source {}
    impl StationSource for Source {
        fn stations_near(
            &self,
            at: Coordinates,
            range: DateRange,
        ) -> Result<Vec<Station>, FetchError>;
        fn daily_observations(
            &self,
            climate_id: &str,
            range: DateRange,
        ) -> Result<Vec<DailyRecord>, FetchError>;
    }
}

pub(crate) const TODAY: Date = date!(2024 - 06 - 15);

#[fixture]
pub(crate) fn cache() -> ClimateCache {
    new_cache()
}

pub(crate) fn new_cache() -> ClimateCache {
    ClimateCache::open_in_memory()
        .expect("in-memory cache")
        .with_clock(FixedClock(TODAY))
}

pub(crate) fn station(climate_id: &str, name: &str) -> Station {
    Station {
        climate_id: climate_id.to_owned(),
        name: name.to_owned(),
        location: Coordinates::new(51.11, -114.02),
    }
}

pub(crate) fn january_2020() -> DateRange {
    DateRange::new(date!(2020 - 01 - 01), date!(2020 - 01 - 03))
}

/// One fully observed record per day of `range`.
pub(crate) fn observed_days(range: DateRange) -> Vec<DailyRecord> {
    let mut records = Vec::new();
    let mut day = Some(range.start());
    while let Some(date) = day.filter(|date| *date <= range.end()) {
        records.push(DailyRecord {
            date,
            tmean: Some(-4.5),
            tmin: Some(-10.0),
            tmax: Some(1.0),
        });
        day = date.next_day();
    }
    records
}

fn selected(cache: ClimateCache, observations: Vec<DailyRecord>) -> MscPlugin<MockSource> {
    let mut plugin = MscPlugin::new(cache, MockSource::new());
    plugin.selection = Some(Selection::new(
        station("3031093", "CALGARY INTL A"),
        january_2020(),
        observations,
    ));
    plugin
}

#[rstest]
fn info_names_the_plugin(cache: ClimateCache) {
    let plugin = MscPlugin::new(cache, MockSource::new());
    assert_eq!(plugin.info().name(), PLUGIN_NAME);
    assert_eq!(plugin.info().version(), 1);
}

#[rstest]
fn series_config_is_available_before_discovery(cache: ClimateCache) {
    let plugin = MscPlugin::new(cache, MockSource::new());
    let series = plugin.series_config().expect("series config");
    let summary: Vec<(&str, &str, Option<&str>)> = series
        .iter()
        .map(|s| (s.id(), s.name(), s.color()))
        .collect();
    assert_eq!(
        summary,
        [
            ("mean_temp", "Mean Temp", Some(CHART_COLORS[0])),
            ("min_temp", "Min Temp", Some(CHART_COLORS[2])),
            ("max_temp", "Max Temp", Some(CHART_COLORS[1])),
        ]
    );
    assert_eq!(plugin.chart_config().err(), Some(PluginError::NotInitialized));
    assert_eq!(
        plugin.series_data("mean_temp", Storage::Interleaved).err(),
        Some(PluginError::NoData)
    );
}

#[rstest]
fn selected_station_names_chart_and_series(cache: ClimateCache) {
    let plugin = selected(cache, observed_days(january_2020()));
    let chart = serde_json::to_value(plugin.chart_config().expect("chart config"))
        .expect("serialise chart");
    assert_eq!(chart["title"], "CALGARY INTL A Temperature History");
    assert_eq!(chart["axis_labels"], json!(["Date", "Temperature (°C)"]));

    let series = plugin.series_config().expect("series config");
    assert_eq!(series[0].name(), "CALGARY INTL A Mean Temp");
    assert_eq!(series[2].id(), "max_temp");
}

#[rstest]
fn series_data_skips_missing_values(cache: ClimateCache) {
    let mut rows = observed_days(january_2020());
    rows[1].tmin = None;
    let plugin = selected(cache, rows);

    let series = plugin
        .series_data("min_temp", Storage::Arrays)
        .expect("series data");
    let points: Vec<(f64, f64)> = series.points().collect();
    assert_eq!(
        points,
        [(1_577_836_800.0, -10.0), (1_578_009_600.0, -10.0)]
    );
}

#[rstest]
fn unknown_series_is_reported(cache: ClimateCache) {
    let plugin = selected(cache, observed_days(january_2020()));
    let error = plugin
        .series_data("snow_depth", Storage::Interleaved)
        .expect_err("series must be rejected");
    assert_eq!(error.to_string(), "Unknown series: snow_depth");
}

#[rstest]
fn discovery_over_the_wire_serves_observations(cache: ClimateCache) {
    let mut source = MockSource::new();
    source
        .expect_stations_near()
        .once()
        .return_once(|_, _| Ok(vec![station("3031093", "CALGARY INTL A")]));
    source
        .expect_daily_observations()
        .withf(|id, range| id == "3031093" && *range == january_2020())
        .once()
        .return_once(|_, range| Ok(observed_days(range)));
    let host = ScriptedHost::new()
        .request("initialize")
        .submit(json!({
            "location": {"lat": 51.1, "lng": -114.0},
            "startDate": "2020-01-01",
            "endDate": "2020-01-03",
        }))
        .submit(json!({"station": "3031093"}))
        .request("get_chart_config")
        .series_request("max_temp");
    let mut session = Session::new(host.transport(), MscPlugin::new(cache, source));
    let report = session.run().expect("session ends cleanly");
    let (transport, plugin) = session.into_parts();
    let messages = without_logs(replies(transport));

    assert_eq!(report.turns(), 3);
    assert!(matches!(&messages[0], Message::ShowForm(form) if form.title() == "MSC Climate Discovery - Step 1/2"));
    assert!(matches!(&messages[1], Message::ShowForm(form) if form.title() == "MSC Climate Discovery - Step 2/2"));
    assert_eq!(messages[2], Message::Result(json!("initialized")));
    assert!(matches!(&messages[3], Message::Result(chart) if chart["title"] == "CALGARY INTL A Temperature History"));
    assert!(matches!(&messages[4], Message::Binary(series) if series.values().len() == 6));
    assert_eq!(
        plugin.selection().map(|selection| selection.observations().len()),
        Some(3)
    );
}

#[test]
fn run_opens_the_cache_in_the_configured_directory() {
    let dir = TempDir::new().expect("create temp dir");
    let cache_dir =
        Utf8PathBuf::from_path_buf(dir.path().join("nested")).expect("utf-8 temp path");
    let config = Config {
        cache_dir: cache_dir.clone(),
        ..Config::default()
    };
    let input = ScriptedHost::new().request("info").into_bytes();
    let mut output = Vec::new();

    let report = run_with_source(&config, Cursor::new(input), &mut output, MockSource::new())
        .expect("plugin runs");

    assert_eq!(report.turns(), 1);
    assert!(cache_dir.join(CACHE_FILE).exists());
    assert!(matches!(
        decode_all(&output).first(),
        Some(Message::PluginInfo(info)) if info.name() == PLUGIN_NAME
    ));
}
