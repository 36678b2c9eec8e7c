//! Plugin SDK for the Olicana charting host.
//!
//! The `olicana-plugins` crate implements the plugin side of the host's IPC
//! protocol. A plugin is a long-lived child process that talks to the host
//! over standard I/O: the host writes one request line, the plugin writes
//! exactly one response before the next request is read. Responses are JSON
//! lines, except for series data, which is a JSON header line followed by a
//! raw little-endian `f64` payload.
//!
//! # Architecture
//!
//! - [`protocol`] defines the closed set of [`Message`] shapes.
//! - [`transport`] frames messages onto a byte stream ([`Transport`]).
//! - [`session`] runs the request loop and dispatches to a [`Plugin`].
//! - [`workflow`] drives multi-step configuration dialogs rendered by the
//!   host, which is how `initialize` is normally implemented.
//! - [`chart`] holds the chart and series descriptions plugins return.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::io::{self, BufReader};
//!
//! use olicana_plugins::{Session, Transport};
//! # use olicana_plugins::{BinarySeries, PluginError, PluginInfo, Plugin, Storage, TransportError};
//! # use olicana_plugins::chart::{ChartConfig, SeriesConfig};
//! # struct Echo;
//! # impl Plugin for Echo {
//! #     fn info(&self) -> PluginInfo { PluginInfo::new("Echo", 1) }
//! #     fn initialize<R: io::BufRead, W: io::Write>(
//! #         &mut self,
//! #         _args: Option<&serde_json::Value>,
//! #         _transport: &mut Transport<R, W>,
//! #     ) -> Result<(), TransportError> { Ok(()) }
//! #     fn chart_config(&self) -> Result<ChartConfig, PluginError> { Err(PluginError::NotInitialized) }
//! #     fn series_config(&self) -> Result<Vec<SeriesConfig>, PluginError> { Ok(Vec::new()) }
//! #     fn series_data(&self, _id: &str, _storage: Storage) -> Result<BinarySeries, PluginError> {
//! #         Err(PluginError::NoData)
//! #     }
//! # }
//!
//! let stdin = io::stdin();
//! let transport = Transport::new(BufReader::new(stdin.lock()), io::stdout().lock());
//! let mut session = Session::new(transport, Echo);
//! session.run().expect("session ends cleanly");
//! ```

pub mod chart;
pub mod error;
pub mod protocol;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod transport;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use self::error::{FetchError, PluginError, TransportError};
pub use self::protocol::{
    BinarySeries, FormSpec, FormUpdate, LogLevel, LogRecord, Message, PluginInfo, Storage,
};
pub use self::session::{Plugin, Session, SessionReport};
pub use self::transport::{LogSink, Transport};
pub use self::workflow::{Preview, Step, Transition, Workflow, WorkflowOutcome, run_workflow};
