//! Open-Meteo climate downloader plugin.
//!
//! The plugin asks the host for one or more city names, a date range and a
//! data mode, loads daily temperatures for each city from a local cache or
//! the Open-Meteo archive, and then serves mean, minimum and maximum
//! temperature series per city.
//!
//! Network access sits behind [`ClimateSource`]. The shipped binary wires
//! [`OfflineSource`], so it answers from the cache alone.

pub mod aggregate;
pub mod schema;
pub mod setup;
pub mod source;

#[cfg(test)]
mod tests;

use std::io::{BufRead, Write};

use olicana_cache::{CacheError, ClimateCache, SearchHistory};
use olicana_config::Config;
use olicana_plugins::chart::{Axis, AxisGroup, ChartConfig, SeriesConfig};
use olicana_plugins::{
    BinarySeries, Plugin, PluginError, PluginInfo, Session, SessionReport, Storage, Transport,
    TransportError, WorkflowOutcome, run_workflow,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::{Variable, points, timestamped};
use crate::setup::{Dataset, SetupWorkflow};

pub use crate::source::{ClimateSource, OfflineSource};

const PLUGIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugin");

/// Name reported in the `info` reply.
pub const PLUGIN_NAME: &str = "Open Meteo Downloader";

/// File name of the observation cache inside the cache directory.
pub const CACHE_FILE: &str = "open_meteo_cache.sq3";

/// Titles list individual cities up to this many.
const MAX_TITLED_CITIES: usize = 3;

/// Plugin state: the cache, the remote source and the loaded dataset.
pub struct OpenMeteoPlugin<S> {
    cache: ClimateCache,
    source: S,
    history: SearchHistory,
    dataset: Option<Dataset>,
}

impl<S: ClimateSource> OpenMeteoPlugin<S> {
    /// Creates an uninitialised plugin.
    #[must_use]
    pub const fn new(cache: ClimateCache, source: S, history: SearchHistory) -> Self {
        Self {
            cache,
            source,
            history,
            dataset: None,
        }
    }

    /// Dataset loaded by the last successful setup.
    #[must_use]
    pub const fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Backing cache.
    #[must_use]
    pub const fn cache(&self) -> &ClimateCache {
        &self.cache
    }
}

impl<S: ClimateSource> Plugin for OpenMeteoPlugin<S> {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PLUGIN_NAME, 1)
    }

    fn initialize<R: BufRead, W: Write>(
        &mut self,
        _args: Option<&serde_json::Value>,
        transport: &mut Transport<R, W>,
    ) -> Result<(), TransportError> {
        let mut workflow = SetupWorkflow::new(&mut self.cache, &self.source, &self.history);
        match run_workflow(transport, &mut workflow)? {
            WorkflowOutcome::Succeeded(dataset) => {
                info!(
                    target: PLUGIN_TARGET,
                    cities = dataset.cities().len(),
                    loaded = dataset.loaded(),
                    "setup completed"
                );
                self.dataset = Some(dataset);
            }
            WorkflowOutcome::Cancelled => {
                info!(target: PLUGIN_TARGET, "setup cancelled");
            }
            WorkflowOutcome::Failed { reason } => {
                warn!(target: PLUGIN_TARGET, %reason, "setup failed");
            }
        }
        Ok(())
    }

    fn chart_config(&self) -> Result<ChartConfig, PluginError> {
        let dataset = self.dataset.as_ref().ok_or(PluginError::NotInitialized)?;
        let title = match dataset.cities() {
            [only] => format!("{only} Temperature History"),
            cities if cities.len() <= MAX_TITLED_CITIES => {
                format!("{} Temperature History", cities.join(", "))
            }
            _ => String::from("Climate Comparison"),
        };
        Ok(ChartConfig::new(title).with_axes(
            AxisGroup::new(0, 0)
                .with_x_axis(Axis::date("Date"))
                .with_y_axis(Axis::new("Temperature (°C)")),
        ))
    }

    fn series_config(&self) -> Result<Vec<SeriesConfig>, PluginError> {
        let dataset = self.dataset.as_ref().ok_or(PluginError::NotInitialized)?;
        let cities = dataset.cities();
        let prefixed = cities.len() > 1;
        Ok(cities
            .iter()
            .flat_map(|city| {
                Variable::ALL.into_iter().map(move |variable| {
                    let name = if prefixed {
                        format!("{city} {}", variable.label())
                    } else {
                        variable.label().to_owned()
                    };
                    SeriesConfig::new(format!("{city}_{variable}"), name)
                })
            })
            .collect())
    }

    fn series_data(
        &self,
        series_id: &str,
        _preferred: Storage,
    ) -> Result<BinarySeries, PluginError> {
        let dataset = self
            .dataset
            .as_ref()
            .filter(|dataset| dataset.loaded() > 0)
            .ok_or(PluginError::NoData)?;
        let (city, suffix) =
            series_id
                .rsplit_once('_')
                .ok_or_else(|| PluginError::InvalidSeriesFormat {
                    series_id: series_id.to_owned(),
                })?;
        let unknown = || PluginError::UnknownSeries {
            series_id: series_id.to_owned(),
        };
        let variable = suffix.parse::<Variable>().map_err(|_| unknown())?;
        let records = dataset.records(city).ok_or_else(unknown)?;
        let plotted = points(records, variable, dataset.mode());
        Ok(BinarySeries::from_points(timestamped(&plotted)))
    }
}

/// Errors that end the plugin process.
#[derive(Debug, Error)]
pub enum RunError {
    /// The observation cache could not be opened.
    #[error("failed to open observation cache: {source}")]
    Cache {
        /// Underlying cache error.
        #[source]
        source: CacheError,
    },
    /// The host connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Serves the host over `reader` and `writer` using the offline source.
///
/// # Errors
///
/// Returns an error if the cache cannot be opened or the host connection
/// fails.
pub fn run<R: BufRead, W: Write>(
    config: &Config,
    reader: R,
    writer: W,
) -> Result<SessionReport, RunError> {
    run_with_source(config, reader, writer, OfflineSource)
}

/// Serves the host with an explicit [`ClimateSource`].
///
/// # Errors
///
/// Returns an error if the cache cannot be opened or the host connection
/// fails.
pub fn run_with_source<R: BufRead, W: Write, S: ClimateSource>(
    config: &Config,
    reader: R,
    writer: W,
    source: S,
) -> Result<SessionReport, RunError> {
    let cache = ClimateCache::open(&config.database_path(CACHE_FILE))
        .map_err(|err| RunError::Cache { source: err })?
        .with_source_lag(config.source_lag_days());
    let history = SearchHistory::new(config.history_path());
    let plugin = OpenMeteoPlugin::new(cache, source, history);
    let mut session = Session::new(Transport::new(reader, writer), plugin);
    Ok(session.run()?)
}
