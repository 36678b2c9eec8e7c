//! MSC climate station plugin.
//!
//! The plugin walks the host through a two-step discovery dialog: pick a
//! location and a date range, then pick one of the stations that reported
//! daily data there. The chosen station's observations are loaded cache
//! first and served as mean, minimum and maximum temperature series.
//!
//! The station inventory sits behind [`StationSource`]. The shipped binary
//! wires [`OfflineSource`], so discovery fails until a client is provided
//! and only cached observations can be charted.

pub mod discovery;
pub mod source;

#[cfg(test)]
mod tests;

use std::io::{BufRead, Write};

use olicana_cache::dates::unix_seconds;
use olicana_cache::{CacheError, ClimateCache, DailyRecord};
use olicana_config::Config;
use olicana_plugins::chart::{CHART_COLORS, ChartConfig, SeriesConfig};
use olicana_plugins::{
    BinarySeries, Plugin, PluginError, PluginInfo, Session, SessionReport, Storage, Transport,
    TransportError, WorkflowOutcome, run_workflow,
};
use strum::{EnumString, IntoStaticStr, VariantArray};
use thiserror::Error;
use tracing::{info, warn};

use crate::discovery::{DiscoveryWorkflow, Selection};

pub use crate::source::{OfflineSource, Station, StationSource};

const PLUGIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugin");

/// Name reported in the `info` reply.
pub const PLUGIN_NAME: &str = "MSC Climate Data";

/// File name of the observation cache inside the cache directory.
pub const CACHE_FILE: &str = "msc_cache.sq3";

/// Temperature series served for the selected station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, VariantArray)]
pub enum Measure {
    /// Daily mean temperature.
    #[strum(serialize = "mean_temp")]
    Mean,
    /// Daily minimum temperature.
    #[strum(serialize = "min_temp")]
    Min,
    /// Daily maximum temperature.
    #[strum(serialize = "max_temp")]
    Max,
}

impl Measure {
    /// Series identifier on the wire.
    #[must_use]
    pub fn id(self) -> &'static str {
        self.into()
    }

    /// Display name without the station prefix.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mean => "Mean Temp",
            Self::Min => "Min Temp",
            Self::Max => "Max Temp",
        }
    }

    /// Palette colour; minimum and maximum swap the second and third slots.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Mean => CHART_COLORS[0],
            Self::Min => CHART_COLORS[2],
            Self::Max => CHART_COLORS[1],
        }
    }

    const fn read(self, record: &DailyRecord) -> Option<f64> {
        match self {
            Self::Mean => record.tmean,
            Self::Min => record.tmin,
            Self::Max => record.tmax,
        }
    }
}

/// Plugin state: the cache, the station source and the current selection.
pub struct MscPlugin<S> {
    cache: ClimateCache,
    source: S,
    selection: Option<Selection>,
}

impl<S: StationSource> MscPlugin<S> {
    /// Creates an uninitialised plugin.
    #[must_use]
    pub const fn new(cache: ClimateCache, source: S) -> Self {
        Self {
            cache,
            source,
            selection: None,
        }
    }

    /// Station and observations chosen by the last successful discovery.
    #[must_use]
    pub const fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }
}

impl<S: StationSource> Plugin for MscPlugin<S> {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PLUGIN_NAME, 1)
    }

    fn initialize<R: BufRead, W: Write>(
        &mut self,
        _args: Option<&serde_json::Value>,
        transport: &mut Transport<R, W>,
    ) -> Result<(), TransportError> {
        let mut workflow = DiscoveryWorkflow::new(&mut self.cache, &self.source);
        match run_workflow(transport, &mut workflow)? {
            WorkflowOutcome::Succeeded(selection) => {
                info!(
                    target: PLUGIN_TARGET,
                    station = %selection.station().climate_id,
                    observations = selection.observations().len(),
                    "discovery completed"
                );
                self.selection = Some(selection);
            }
            WorkflowOutcome::Cancelled => {
                info!(target: PLUGIN_TARGET, "discovery cancelled");
            }
            WorkflowOutcome::Failed { reason } => {
                warn!(target: PLUGIN_TARGET, %reason, "discovery failed");
            }
        }
        Ok(())
    }

    fn chart_config(&self) -> Result<ChartConfig, PluginError> {
        let selection = self.selection.as_ref().ok_or(PluginError::NotInitialized)?;
        Ok(
            ChartConfig::new(format!("{} Temperature History", selection.station().name))
                .with_axis_labels("Date", "Temperature (°C)"),
        )
    }

    fn series_config(&self) -> Result<Vec<SeriesConfig>, PluginError> {
        let prefix = self
            .selection
            .as_ref()
            .map(|selection| format!("{} ", selection.station().name))
            .unwrap_or_default();
        Ok(Measure::VARIANTS
            .iter()
            .map(|measure| {
                SeriesConfig::new(measure.id(), format!("{prefix}{}", measure.label()))
                    .with_color(measure.color())
            })
            .collect())
    }

    fn series_data(
        &self,
        series_id: &str,
        _preferred: Storage,
    ) -> Result<BinarySeries, PluginError> {
        let observations = self
            .selection
            .as_ref()
            .map(Selection::observations)
            .filter(|rows| !rows.is_empty())
            .ok_or(PluginError::NoData)?;
        let measure = series_id
            .parse::<Measure>()
            .map_err(|_| PluginError::UnknownSeries {
                series_id: series_id.to_owned(),
            })?;
        Ok(BinarySeries::from_points(observations.iter().filter_map(
            |record| measure.read(record).map(|value| (timestamp(record), value)),
        )))
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "Unix seconds for calendar dates fit in the f64 mantissa"
)]
fn timestamp(record: &DailyRecord) -> f64 {
    unix_seconds(record.date) as f64
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

/// Serves the host with an explicit [`StationSource`].
///
/// # Errors
///
/// Returns an error if the cache cannot be opened or the host connection
/// fails.
pub fn run_with_source<R: BufRead, W: Write, S: StationSource>(
    config: &Config,
    reader: R,
    writer: W,
    source: S,
) -> Result<SessionReport, RunError> {
    let cache = ClimateCache::open(&config.database_path(CACHE_FILE))
        .map_err(|err| RunError::Cache { source: err })?
        .with_source_lag(config.source_lag_days());
    let plugin = MscPlugin::new(cache, source);
    let mut session = Session::new(Transport::new(reader, writer), plugin);
    Ok(session.run()?)
}
