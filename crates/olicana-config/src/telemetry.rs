//! Diagnostics for a plugin process.
//!
//! The host reads protocol records from the plugin's stdout, so tracing
//! events go to stderr, where the host leaves them alone. The subscriber is
//! process-global and is installed at most once.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};

use crate::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Reasons the plugin's diagnostics could not be set up.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid `EnvFilter` directive list.
    #[error("log filter is not valid: {0}")]
    Filter(String),
    /// Something else already owns the global subscriber.
    #[error("could not route plugin diagnostics to stderr: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Routes this process's tracing events to stderr.
///
/// Only the first successful call installs a subscriber; later calls succeed
/// without changes, so both binaries and tests may call it freely.
///
/// # Errors
///
/// Fails when the configured filter is invalid or when a subscriber was
/// installed by other means.
pub fn initialise(config: &Config) -> Result<(), TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(config))
        .map(|&()| ())
}

/// Checks a filter directive list.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] with the parser's explanation.
pub fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|err| TelemetryError::Filter(err.to_string()))
}

fn install(config: &Config) -> Result<(), TelemetryError> {
    let subscriber = stderr_subscriber(parse_filter(config.log_filter())?, config.log_format());
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn stderr_subscriber(filter: EnvFilter, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    let events = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339())
        .with_target(true);
    match format {
        LogFormat::Json => Box::new(events.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(events.compact().finish()),
    }
}
