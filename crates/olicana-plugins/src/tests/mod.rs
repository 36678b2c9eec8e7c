//! Crate-level fakes and BDD tests.

use std::io::{self, BufRead, Read, Write};

use serde_json::{Value, json};

use crate::chart::{ChartConfig, SeriesConfig};
use crate::error::{PluginError, TransportError};
use crate::protocol::{BinarySeries, FormSpec, FormUpdate, PluginInfo, Storage};
use crate::session::Plugin;
use crate::transport::{LogSink, Transport};
use crate::workflow::{Preview, Step, Transition, Workflow, WorkflowOutcome, run_workflow};

mod behaviour;

/// Reader whose every read fails.
pub(crate) struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("disk on fire"))
    }
}

/// Writer whose peer has gone away.
pub(crate) struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Station identifiers known to [`DiscoveryWorkflow`], keyed by place.
const STATIONS: &[(&str, &str)] = &[("calgary", "3031093"), ("calgary", "3031094")];

/// Two-step wizard: search a place, then pick one of the stations found.
#[derive(Debug, Default)]
pub(crate) struct DiscoveryWorkflow {
    query: String,
    candidates: Vec<String>,
    preview_query: String,
}

impl DiscoveryWorkflow {
    fn search(&mut self, query: &str) -> usize {
        self.query = query.to_owned();
        self.candidates = STATIONS
            .iter()
            .filter(|(place, _)| *place == query)
            .map(|(_, id)| (*id).to_owned())
            .collect();
        self.candidates.len()
    }
}

impl Workflow for DiscoveryWorkflow {
    type Output = String;

    fn step_count(&self) -> usize {
        2
    }

    fn form(&self, step: Step) -> FormSpec {
        if step == Step::FIRST {
            FormSpec::new("Discovery - Step 1/2", json!({"type": "object"}), json!({}))
                .with_data(json!({ "query": self.query }))
                .with_form_change()
        } else {
            FormSpec::new("Discovery - Step 2/2", json!({"type": "object"}), json!({}))
                .with_data(json!({ "station": self.candidates.first() }))
        }
    }

    fn submit(&mut self, step: Step, input: Value, log: &mut dyn LogSink) -> Transition<String> {
        if step == Step::FIRST {
            let query = input.get("query").and_then(Value::as_str).unwrap_or_default();
            log.info(&format!("Searching near {query}..."));
            if self.search(query) == 0 {
                let message = format!("No stations found near {query}");
                log.warn(&message);
                return Transition::retry(message);
            }
            return Transition::Advance;
        }

        let selected = input.get("station").and_then(Value::as_str);
        match selected.filter(|id| self.candidates.iter().any(|known| known.as_str() == *id)) {
            Some(id) => Transition::Succeed(id.to_owned()),
            None => Transition::regress(Step::FIRST, "Selection lost. Please try again."),
        }
    }

    fn form_change(&mut self, _step: Step, data: Value, _log: &mut dyn LogSink) -> Preview {
        let query = data.get("query").and_then(Value::as_str).unwrap_or_default();
        if query == self.preview_query {
            return Preview::Unchanged;
        }
        self.preview_query = query.to_owned();
        Preview::Updated(FormUpdate::new(
            json!({ "query": query, "preview": query.to_uppercase() }),
        ))
    }

    fn cancelled(&mut self, log: &mut dyn LogSink) {
        log.info("Discovery cancelled");
    }
}

/// Plugin serving one series once a station has been discovered.
#[derive(Debug, Default)]
pub(crate) struct StationPlugin {
    station: Option<String>,
}

impl StationPlugin {
    pub(crate) fn station(&self) -> Option<&str> {
        self.station.as_deref()
    }
}

impl Plugin for StationPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("Station Plugin", 1)
    }

    fn initialize<R: BufRead, W: Write>(
        &mut self,
        _args: Option<&Value>,
        transport: &mut Transport<R, W>,
    ) -> Result<(), TransportError> {
        let mut workflow = DiscoveryWorkflow::default();
        if let WorkflowOutcome::Succeeded(station) = run_workflow(transport, &mut workflow)? {
            self.station = Some(station);
        }
        Ok(())
    }

    fn chart_config(&self) -> Result<ChartConfig, PluginError> {
        let station = self.station.as_deref().ok_or(PluginError::NotInitialized)?;
        Ok(ChartConfig::new(format!("{station} Temperature History"))
            .with_axis_labels("Date", "Temperature (°C)"))
    }

    fn series_config(&self) -> Result<Vec<SeriesConfig>, PluginError> {
        Ok(vec![SeriesConfig::new("mean_temp", "Mean Temp")])
    }

    fn series_data(&self, series_id: &str, _preferred: Storage) -> Result<BinarySeries, PluginError> {
        if self.station.is_none() {
            return Err(PluginError::NoData);
        }
        if series_id != "mean_temp" {
            return Err(PluginError::UnknownSeries {
                series_id: series_id.to_owned(),
            });
        }
        Ok(BinarySeries::from_points([
            (1_577_836_800.0, -3.5),
            (1_577_923_200.0, -1.25),
        ]))
    }
}
