//! Request dispatch loop.
//!
//! A [`Session`] alternates between reading one host request and writing
//! exactly one response. The only exception is `initialize`, which hands the
//! transport to the plugin so it can run a multi-turn workflow; the loop
//! resumes reading once the plugin returns.

use std::io::{BufRead, Write};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::chart::{ChartConfig, SeriesConfig};
use crate::error::{PluginError, TransportError};
use crate::protocol::{BinarySeries, Message, PluginInfo, Storage};
use crate::transport::Transport;

/// Tracing target for session operations.
const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Behaviour a plugin supplies to the session loop.
///
/// Query handlers return a [`PluginError`] for recoverable failures; the
/// session writes its text to the host as an `error` reply.
pub trait Plugin {
    /// Identifies the plugin.
    fn info(&self) -> PluginInfo;

    /// Runs the plugin's configuration dialog.
    ///
    /// The plugin owns the transport for the whole call and must leave
    /// exactly one terminal reply (`result` or `error`) on it, normally by
    /// delegating to [`crate::run_workflow`].
    ///
    /// # Errors
    ///
    /// Returns an error only when the transport fails.
    fn initialize<R: BufRead, W: Write>(
        &mut self,
        args: Option<&Value>,
        transport: &mut Transport<R, W>,
    ) -> Result<(), TransportError>;

    /// Describes the chart to draw.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin has nothing to chart yet.
    fn chart_config(&self) -> Result<ChartConfig, PluginError>;

    /// Lists the series the plugin can serve.
    ///
    /// # Errors
    ///
    /// Returns an error if the series are not known yet.
    fn series_config(&self) -> Result<Vec<SeriesConfig>, PluginError>;

    /// Produces the values for one series.
    ///
    /// # Errors
    ///
    /// Returns an error if no data is loaded or the identifier is unknown.
    fn series_data(&self, series_id: &str, preferred: Storage)
    -> Result<BinarySeries, PluginError>;
}

/// Summary of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    turns: usize,
}

impl SessionReport {
    /// Returns the number of requests served.
    #[must_use]
    pub const fn turns(&self) -> usize {
        self.turns
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Dispatching,
}

/// Single-threaded request loop bound to one plugin.
#[derive(Debug)]
pub struct Session<R, W, P> {
    transport: Transport<R, W>,
    plugin: P,
    state: SessionState,
}

impl<R, W, P> Session<R, W, P> {
    /// Binds a plugin to a transport.
    #[must_use]
    pub const fn new(transport: Transport<R, W>, plugin: P) -> Self {
        Self {
            transport,
            plugin,
            state: SessionState::Idle,
        }
    }

    /// Returns the plugin.
    #[must_use]
    pub const fn plugin(&self) -> &P {
        &self.plugin
    }

    /// Releases the transport and plugin.
    pub fn into_parts(self) -> (Transport<R, W>, P) {
        (self.transport, self.plugin)
    }

    fn enter(&mut self, next: SessionState) {
        debug!(target: SESSION_TARGET, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

impl<R: BufRead, W: Write, P: Plugin> Session<R, W, P> {
    /// Serves requests until the host closes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails; framing errors end the
    /// session cleanly instead.
    pub fn run(&mut self) -> Result<SessionReport, TransportError> {
        let mut turns = 0_usize;
        while self.serve_one()? {
            turns = turns.saturating_add(1);
        }
        info!(target: SESSION_TARGET, turns, "host closed the session");
        Ok(SessionReport { turns })
    }

    /// Reads and answers one request.
    ///
    /// Returns `false` once the stream has ended.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    pub fn serve_one(&mut self) -> Result<bool, TransportError> {
        let Some(message) = self.transport.read()? else {
            return Ok(false);
        };
        self.enter(SessionState::Dispatching);
        let outcome = self.dispatch(message);
        self.enter(SessionState::Idle);
        outcome.map(|()| true)
    }

    fn dispatch(&mut self, message: Message) -> Result<(), TransportError> {
        debug!(target: SESSION_TARGET, kind = message.kind(), "dispatching");
        match message {
            Message::Info => {
                let info = self.plugin.info();
                self.transport.write_control(&Message::PluginInfo(info))
            }
            Message::Initialize { args } => {
                self.plugin.initialize(args.as_ref(), &mut self.transport)
            }
            Message::GetChartConfig => {
                let reply = self.plugin.chart_config();
                self.reply(reply)
            }
            Message::GetSeriesConfig => {
                let reply = self.plugin.series_config();
                self.reply(reply)
            }
            Message::GetSeriesData {
                series_id,
                preferred_storage,
            } => {
                let reply = series_id
                    .ok_or_else(|| PluginError::missing_argument("series_id"))
                    .and_then(|id| self.plugin.series_data(&id, preferred_storage));
                match reply {
                    Ok(series) => self.transport.write_binary(&series),
                    Err(err) => self.reply_error(&err),
                }
            }
            Message::UnknownMethod { method } => {
                self.reply_error(&PluginError::UnknownMethod { method })
            }
            Message::InvalidRequest { method, reason, .. } => {
                self.reply_error(&PluginError::InvalidArguments { method, reason })
            }
            other => self.reply_error(&PluginError::UnexpectedMessage { kind: other.kind() }),
        }
    }

    fn reply<T: Serialize>(&mut self, reply: Result<T, PluginError>) -> Result<(), TransportError> {
        match reply {
            Ok(value) => {
                let result = serde_json::to_value(value).map_err(TransportError::Serialize)?;
                self.transport.write_control(&Message::Result(result))
            }
            Err(err) => self.reply_error(&err),
        }
    }

    fn reply_error(&mut self, err: &PluginError) -> Result<(), TransportError> {
        debug!(target: SESSION_TARGET, error = %err, "replying with error");
        self.transport.write_control(&Message::Error(err.to_string()))
    }
}
