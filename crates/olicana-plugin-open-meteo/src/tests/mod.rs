//! Plugin-level tests and shared fixtures.


use std::collections::HashMap;
use std::io::Cursor;

use camino::Utf8PathBuf;
use mockall::mock;
use olicana_cache::{
    ClimateCache, Coordinates, DailyRecord, DateRange, FixedClock, HistoryEntry, SearchHistory,
};
use olicana_config::Config;
use olicana_plugins::test_support::{ScriptedHost, decode_all, replies, without_logs};
use olicana_plugins::{FetchError, Message, Plugin, PluginError, Session};
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;
use time::Date;
use time::macros::date;

use crate::aggregate::DataMode;
use crate::setup::Dataset;
use crate::{ClimateSource, OpenMeteoPlugin, PLUGIN_NAME, run_with_source};

mock! {
    pub Source {}
    impl ClimateSource for Source {
        fn geocode(&self, name: &str) -> Result<Coordinates, FetchError>;
        fn daily_archive(
            &self,
            at: Coordinates,
            range: DateRange,
        ) -> Result<Vec<DailyRecord>, FetchError>;
    }
}

pub(crate) const TODAY: Date = date!(2024 - 06 - 15);
pub(crate) const CALGARY: Coordinates = Coordinates::new(51.05, -114.07);
pub(crate) const OSLO: Coordinates = Coordinates::new(59.91, 10.75);

/// In-memory cache pinned to [`TODAY`] plus a history file in a scratch dir.
pub(crate) struct Fixture {
    pub(crate) cache: ClimateCache,
    pub(crate) history: SearchHistory,
    _dir: TempDir,
}

impl Fixture {
    /// Registers `city` and stores one mean temperature per day of `range`.
    pub(crate) fn seed(&mut self, city: &str, at: Coordinates, range: DateRange) {
        self.cache.upsert_entity(city, at).expect("register city");
        self.cache
            .merge(city, &mean_days(range, 1.5))
            .expect("seed observations");
    }

    pub(crate) fn remember(&self, cities: &[&str], range: DateRange) {
        self.history
            .record(HistoryEntry {
                cities: cities.iter().map(|city| (*city).to_owned()).collect(),
                start_date: range.start(),
                end_date: range.end(),
            })
            .expect("record history");
    }
}

#[fixture]
pub(crate) fn fixture() -> Fixture {
    new_fixture()
}

pub(crate) fn new_fixture() -> Fixture {
    let dir = TempDir::new().expect("create temp dir");
    let history_path = Utf8PathBuf::from_path_buf(dir.path().join("search_history.json"))
        .expect("utf-8 temp path");
    Fixture {
        cache: ClimateCache::open_in_memory()
            .expect("in-memory cache")
            .with_clock(FixedClock(TODAY)),
        history: SearchHistory::new(history_path),
        _dir: dir,
    }
}

/// One record per day of `range`, each with mean `tmean`.
pub(crate) fn mean_days(range: DateRange, tmean: f64) -> Vec<DailyRecord> {
    let mut records = Vec::new();
    let mut day = Some(range.start());
    while let Some(date) = day.filter(|date| *date <= range.end()) {
        records.push(DailyRecord {
            date,
            tmean: Some(tmean),
            tmin: None,
            tmax: None,
        });
        day = date.next_day();
    }
    records
}

pub(crate) fn january_2020() -> DateRange {
    DateRange::new(date!(2020 - 01 - 01), date!(2020 - 01 - 03))
}

fn plugin_with(fixture: Fixture, cities: &[&str]) -> OpenMeteoPlugin<MockSource> {
    let names: Vec<String> = cities.iter().map(|city| (*city).to_owned()).collect();
    let records: HashMap<String, Vec<DailyRecord>> = names
        .iter()
        .map(|city| (city.clone(), mean_days(january_2020(), 2.0)))
        .collect();
    let mut plugin = OpenMeteoPlugin::new(fixture.cache, MockSource::new(), fixture.history);
    plugin.dataset = Some(Dataset::new(
        names,
        january_2020(),
        DataMode::Daily,
        records,
    ));
    plugin
}

#[rstest]
fn info_names_the_plugin(fixture: Fixture) {
    let plugin = OpenMeteoPlugin::new(fixture.cache, MockSource::new(), fixture.history);
    assert_eq!(plugin.info().name(), PLUGIN_NAME);
    assert_eq!(plugin.info().version(), 1);
}

#[rstest]
fn queries_before_setup_are_refused(fixture: Fixture) {
    let plugin = OpenMeteoPlugin::new(fixture.cache, MockSource::new(), fixture.history);
    assert_eq!(plugin.chart_config().err(), Some(PluginError::NotInitialized));
    assert_eq!(plugin.series_config().err(), Some(PluginError::NotInitialized));
    assert_eq!(
        plugin.series_data("Calgary_tmean", olicana_plugins::Storage::Interleaved).err(),
        Some(PluginError::NoData)
    );
}

#[rstest]
#[case::one(&["Calgary"], "Calgary Temperature History")]
#[case::three(&["Calgary", "Oslo", "Lima"], "Calgary, Oslo, Lima Temperature History")]
#[case::many(&["Calgary", "Oslo", "Lima", "Quito"], "Climate Comparison")]
fn chart_title_depends_on_city_count(
    fixture: Fixture,
    #[case] cities: &[&str],
    #[case] title: &str,
) {
    let config = plugin_with(fixture, cities)
        .chart_config()
        .expect("chart config");
    let value = serde_json::to_value(&config).expect("serialise chart");
    assert_eq!(value["title"], title);
    assert_eq!(value["axes"][0]["subplot"], json!([0, 0]));
    assert_eq!(value["axes"][0]["x_axes"][0], json!({"title": "Date", "type": "date"}));
    assert_eq!(value["axes"][0]["y_axes"][0]["title"], "Temperature (°C)");
}

#[rstest]
fn single_city_series_are_unprefixed(fixture: Fixture) {
    let series = plugin_with(fixture, &["Calgary"])
        .series_config()
        .expect("series config");
    let names: Vec<(&str, &str)> = series.iter().map(|s| (s.id(), s.name())).collect();
    assert_eq!(
        names,
        [
            ("Calgary_tmean", "Mean Temp"),
            ("Calgary_tmin", "Min Temp"),
            ("Calgary_tmax", "Max Temp"),
        ]
    );
}

#[rstest]
fn several_cities_prefix_series_names(fixture: Fixture) {
    let series = plugin_with(fixture, &["Calgary", "St_John"])
        .series_config()
        .expect("series config");
    assert_eq!(series.len(), 6);
    assert_eq!(series[3].id(), "St_John_tmean");
    assert_eq!(series[3].name(), "St_John Mean Temp");
}

#[rstest]
fn series_ids_split_at_the_last_underscore(fixture: Fixture) {
    let plugin = plugin_with(fixture, &["St_John"]);
    let series = plugin
        .series_data("St_John_tmean", olicana_plugins::Storage::Arrays)
        .expect("series data");
    assert_eq!(series.values().len(), 6);
    assert_eq!(series.points().next(), Some((1_577_836_800.0, 2.0)));
}

#[rstest]
#[case::no_separator("Calgary", "Invalid series format: Calgary")]
#[case::unknown_city("Oslo_tmean", "Unknown series: Oslo_tmean")]
#[case::unknown_variable("Calgary_tavg", "Unknown series: Calgary_tavg")]
fn bad_series_ids_are_reported(fixture: Fixture, #[case] series_id: &str, #[case] text: &str) {
    let error = plugin_with(fixture, &["Calgary"])
        .series_data(series_id, olicana_plugins::Storage::Interleaved)
        .expect_err("series must be rejected");
    assert_eq!(error.to_string(), text);
}

#[rstest]
fn cached_setup_serves_series_over_the_wire(mut fixture: Fixture) {
    fixture.seed("Calgary", CALGARY, january_2020());
    let plugin = OpenMeteoPlugin::new(fixture.cache, MockSource::new(), fixture.history);
    let host = ScriptedHost::new()
        .request("initialize")
        .submit(json!({
            "search_type": "New Search",
            "cities": ["Calgary"],
            "start_date": "2020-01-01",
            "end_date": "2020-01-03",
            "mode": "Daily",
        }))
        .request("get_series_config")
        .series_request("Calgary_tmax")
        .series_request("Calgary_tmean");
    let mut session = Session::new(host.transport(), plugin);
    let report = session.run().expect("session ends cleanly");
    let (transport, _) = session.into_parts();
    let messages = without_logs(replies(transport));

    assert_eq!(report.turns(), 4);
    assert!(matches!(&messages[0], Message::ShowForm(form) if form.title() == "Open Meteo Configuration"));
    assert_eq!(messages[1], Message::Result(json!("initialized")));
    assert!(matches!(&messages[2], Message::Result(series) if series[0]["id"] == "Calgary_tmean"));
    // tmax was never observed, so the series is empty rather than missing.
    assert!(matches!(&messages[3], Message::Binary(series) if series.values().is_empty()));
    assert!(matches!(&messages[4], Message::Binary(series) if series.values().len() == 6));
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
    assert!(cache_dir.join(crate::CACHE_FILE).exists());
    assert!(matches!(
        decode_all(&output).first(),
        Some(Message::PluginInfo(info)) if info.name() == PLUGIN_NAME
    ));
}
