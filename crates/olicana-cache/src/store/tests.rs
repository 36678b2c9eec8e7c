//! Unit tests for the observation store.

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use time::macros::date;

use super::*;
use crate::coverage::FixedClock;

const CALGARY: Coordinates = Coordinates::new(51.05, -114.07);

fn record(date: Date, tmean: f64) -> DailyRecord {
    DailyRecord {
        date,
        tmean: Some(tmean),
        tmin: None,
        tmax: None,
    }
}

fn range(start: Date, end: Date) -> DateRange {
    DateRange::new(start, end)
}

#[fixture]
fn cache() -> ClimateCache {
    ClimateCache::open_in_memory()
        .expect("in-memory cache")
        .with_clock(FixedClock(date!(2030 - 01 - 01)))
}

#[rstest]
fn upsert_keeps_the_identifier_and_refreshes_coordinates(cache: ClimateCache) {
    let first = cache.upsert_entity("Calgary", CALGARY).expect("insert");
    let moved = Coordinates::new(51.0447, -114.0719);
    let second = cache.upsert_entity("Calgary", moved).expect("update");

    assert_eq!(first, second);
    assert_eq!(cache.location("Calgary").expect("lookup"), Some(moved));
}

#[rstest]
fn distinct_names_get_distinct_identifiers(cache: ClimateCache) {
    let calgary = cache.upsert_entity("Calgary", CALGARY).expect("insert");
    let oslo = cache
        .upsert_entity("Oslo", Coordinates::new(59.91, 10.75))
        .expect("insert");
    assert_ne!(calgary, oslo);
}

#[rstest]
fn unknown_entities_have_no_location_or_data(cache: ClimateCache) {
    let all = range(Date::MIN, Date::MAX);
    assert_eq!(cache.location("Atlantis").expect("lookup"), None);
    assert!(!cache.is_covered("Atlantis", all).expect("coverage"));
    assert!(cache.fetch("Atlantis", all).expect("fetch").is_empty());
}

#[rstest]
fn merge_requires_a_registered_entity(mut cache: ClimateCache) {
    let err = cache
        .merge("Atlantis", &[record(date!(2020 - 01 - 01), 1.0)])
        .expect_err("unknown entity");
    assert!(matches!(err, CacheError::UnknownEntity { name } if name == "Atlantis"));
}

#[rstest]
fn fetch_returns_the_range_in_date_order(mut cache: ClimateCache) {
    cache.upsert_entity("Calgary", CALGARY).expect("insert");
    cache
        .merge(
            "Calgary",
            &[
                record(date!(2020 - 01 - 03), 3.0),
                record(date!(2020 - 01 - 01), 1.0),
                record(date!(2020 - 01 - 02), 2.0),
                record(date!(2020 - 01 - 04), 4.0),
            ],
        )
        .expect("merge");

    let fetched = cache
        .fetch("Calgary", range(date!(2020 - 01 - 02), date!(2020 - 01 - 03)))
        .expect("fetch");
    assert_eq!(
        fetched,
        [
            record(date!(2020 - 01 - 02), 2.0),
            record(date!(2020 - 01 - 03), 3.0)
        ]
    );
}

#[rstest]
fn reversed_range_fetches_nothing(mut cache: ClimateCache) {
    cache.upsert_entity("Calgary", CALGARY).expect("insert");
    cache
        .merge("Calgary", &[record(date!(2020 - 01 - 01), 1.0)])
        .expect("merge");
    let fetched = cache
        .fetch("Calgary", range(date!(2020 - 02 - 01), date!(2020 - 01 - 01)))
        .expect("fetch");
    assert!(fetched.is_empty());
}

#[rstest]
fn merge_is_idempotent_and_last_write_wins(mut cache: ClimateCache) {
    cache.upsert_entity("Calgary", CALGARY).expect("insert");
    let batch = [
        record(date!(2020 - 01 - 01), 1.0),
        record(date!(2020 - 01 - 02), 2.0),
    ];
    let all = range(date!(2020 - 01 - 01), date!(2020 - 12 - 31));

    cache.merge("Calgary", &batch).expect("first merge");
    let once = cache.fetch("Calgary", all).expect("fetch");
    cache.merge("Calgary", &batch).expect("second merge");
    assert_eq!(cache.fetch("Calgary", all).expect("fetch"), once);

    cache
        .merge("Calgary", &[record(date!(2020 - 01 - 02), -5.5)])
        .expect("overwrite");
    let fetched = cache.fetch("Calgary", all).expect("fetch");
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched.last().and_then(|day| day.tmean), Some(-5.5));
}

#[rstest]
fn missing_values_survive_the_round_trip(mut cache: ClimateCache) {
    cache.upsert_entity("Calgary", CALGARY).expect("insert");
    let gap = DailyRecord {
        date: date!(2021 - 07 - 01),
        tmean: None,
        tmin: Some(12.0),
        tmax: None,
    };
    cache.merge("Calgary", &[gap]).expect("merge");
    let fetched = cache
        .fetch("Calgary", range(gap.date, gap.date))
        .expect("fetch");
    assert_eq!(fetched, [gap]);
}

#[rstest]
fn single_cached_day_covers_itself(mut cache: ClimateCache) {
    cache.upsert_entity("Calgary", CALGARY).expect("insert");
    cache
        .merge("Calgary", &[record(date!(2020 - 01 - 01), 1.0)])
        .expect("merge");
    let day = range(date!(2020 - 01 - 01), date!(2020 - 01 - 01));
    assert!(cache.is_covered("Calgary", day).expect("coverage"));
}

#[rstest]
fn registered_entity_without_data_is_not_covered(cache: ClimateCache) {
    cache.upsert_entity("Calgary", CALGARY).expect("insert");
    let day = range(date!(2020 - 01 - 01), date!(2020 - 01 - 01));
    assert!(!cache.is_covered("Calgary", day).expect("coverage"));
}

#[rstest]
#[case::default_lag(7, true)]
#[case::no_lag(0, false)]
fn coverage_honours_the_source_lag(#[case] lag: u16, #[case] covered: bool) {
    let today = date!(2024 - 06 - 15);
    let mut cache = ClimateCache::open_in_memory()
        .expect("in-memory cache")
        .with_clock(FixedClock(today))
        .with_source_lag(lag);
    cache.upsert_entity("Oslo", CALGARY).expect("insert");
    cache
        .merge(
            "Oslo",
            &[
                record(date!(2024 - 06 - 01), 15.0),
                record(date!(2024 - 06 - 08), 16.0),
            ],
        )
        .expect("merge");

    let wanted = range(date!(2024 - 06 - 01), today);
    assert_eq!(cache.is_covered("Oslo", wanted).expect("coverage"), covered);
}

#[test]
fn on_disk_cache_persists_between_opens() {
    let dir = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("nested").join("cache.sq3"))
        .expect("utf-8 temp path");

    {
        let mut cache = ClimateCache::open(&path).expect("create");
        cache.upsert_entity("Calgary", CALGARY).expect("insert");
        cache
            .merge("Calgary", &[record(date!(2020 - 01 - 01), 1.0)])
            .expect("merge");
    }

    let reopened = ClimateCache::open(&path).expect("reopen");
    assert_eq!(reopened.location("Calgary").expect("lookup"), Some(CALGARY));
    let all = range(date!(2020 - 01 - 01), date!(2020 - 01 - 31));
    assert_eq!(reopened.fetch("Calgary", all).expect("fetch").len(), 1);
}
