//! Unit tests for configuration defaults and derived paths.

use camino::Utf8PathBuf;
use rstest::rstest;

use crate::telemetry::{TelemetryError, parse_filter};
use crate::{Config, LogFormat};

#[test]
fn defaults_match_the_documented_values() {
    let config = Config::default();
    assert_eq!(config.cache_dir(), ".");
    assert_eq!(config.history_path(), Utf8PathBuf::from("./search_history.json"));
    assert_eq!(config.source_lag_days(), 7);
    assert_eq!(config.log_filter(), "info");
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[test]
fn database_lives_in_the_cache_directory() {
    let config = Config {
        cache_dir: Utf8PathBuf::from("/var/cache/olicana"),
        ..Config::default()
    };
    assert_eq!(
        config.database_path("msc_cache.sq3"),
        Utf8PathBuf::from("/var/cache/olicana/msc_cache.sq3")
    );
}

#[test]
fn absolute_history_path_is_kept() {
    let config = Config {
        cache_dir: Utf8PathBuf::from("/var/cache/olicana"),
        history_file: Utf8PathBuf::from("/home/user/history.json"),
        ..Config::default()
    };
    assert_eq!(
        config.history_path(),
        Utf8PathBuf::from("/home/user/history.json")
    );
}

#[rstest]
#[case::json("json", LogFormat::Json)]
#[case::compact("compact", LogFormat::Compact)]
#[case::mixed_case("Compact", LogFormat::Compact)]
fn log_format_parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
    assert_eq!(text.parse::<LogFormat>().expect("known format"), expected);
}

#[test]
fn unknown_log_format_is_rejected() {
    assert!("pretty".parse::<LogFormat>().is_err());
}

#[rstest]
#[case::level("debug")]
#[case::directive("olicana_cache=trace,info")]
fn valid_filters_parse(#[case] expression: &str) {
    assert!(parse_filter(expression).is_ok());
}

#[test]
fn invalid_filter_is_reported() {
    let error = parse_filter("olicana_cache=loud").expect_err("filter must be rejected");
    assert!(matches!(error, TelemetryError::Filter(_)));
}

#[test]
fn diagnostics_install_once() {
    let config = Config::default();
    assert!(crate::telemetry::initialise(&config).is_ok());
    assert!(crate::telemetry::initialise(&config).is_ok());
    assert!(tracing::dispatcher::has_been_set());
}

#[test]
fn filter_error_names_the_problem() {
    let error = parse_filter("olicana_cache=loud").expect_err("filter must be rejected");
    assert!(error.to_string().starts_with("log filter is not valid"));
}
