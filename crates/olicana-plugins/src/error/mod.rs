//! Domain errors raised by the plugin SDK.
//!
//! Errors fall into three families. [`TransportError`] means the byte stream to
//! the host can no longer be trusted and ends the session. [`PluginError`] is a
//! recoverable protocol or handler failure; its `Display` text is written to
//! the host verbatim as an `{error: ...}` reply. [`FetchError`] describes a
//! failure of a remote collaborator and carries a kind so callers can tell a
//! retryable upstream fault from a permanent one.
//!
//! I/O errors are wrapped in `Arc` to satisfy the `result_large_err` Clippy
//! lint.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising while reading from or writing to the host.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading from the host failed below the framing layer.
    #[error("failed to read from host: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Writing or flushing a message to the host failed.
    #[error("failed to write to host: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A message could not be serialised as a JSON record.
    #[error("failed to serialise protocol message: {0}")]
    Serialize(#[source] serde_json::Error),

    /// An interleaved series was built from an odd number of values.
    #[error("interleaved series needs x,y pairs but received {count} values")]
    OddInterleavedSeries {
        /// Number of values supplied.
        count: usize,
    },

    /// A binary series was handed to the control-record writer.
    #[error("binary series must be written as a binary frame")]
    BinaryAsControl,
}

impl TransportError {
    pub(crate) fn read(source: std::io::Error) -> Self {
        Self::Read {
            source: Arc::new(source),
        }
    }

    pub(crate) fn write(source: std::io::Error) -> Self {
        Self::Write {
            source: Arc::new(source),
        }
    }
}

/// Recoverable failures reported to the host as `{error: message}`.
///
/// The `Display` output of each variant is the exact text the host receives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// A query arrived before `initialize` completed.
    #[error("Not initialized")]
    NotInitialized,

    /// Series data was requested but nothing has been loaded.
    #[error("No data available")]
    NoData,

    /// The host sent a method this plugin does not implement.
    #[error("Unknown method: {method}")]
    UnknownMethod {
        /// Method name as received.
        method: String,
    },

    /// A known method arrived with arguments of the wrong shape.
    #[error("Invalid arguments for {method}: {reason}")]
    InvalidArguments {
        /// Method name as received.
        method: String,
        /// Decoder's description of the problem.
        reason: String,
    },

    /// A request omitted an argument its handler requires.
    #[error("Missing required argument: {name}")]
    MissingArgument {
        /// Argument name.
        name: String,
    },

    /// The requested series identifier is not produced by this plugin.
    #[error("Unknown series: {series_id}")]
    UnknownSeries {
        /// Identifier as received.
        series_id: String,
    },

    /// The series identifier does not follow the plugin's naming scheme.
    #[error("Invalid series format: {series_id}")]
    InvalidSeriesFormat {
        /// Identifier as received.
        series_id: String,
    },

    /// A reply-shaped message arrived when no request was outstanding.
    #[error("Unexpected {kind} message")]
    UnexpectedMessage {
        /// Short label for the message shape.
        kind: &'static str,
    },
}

impl PluginError {
    /// Convenience constructor for [`PluginError::MissingArgument`].
    #[must_use]
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }
}

/// Failures of remote data sources consulted by workflows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The service could not be reached or refused the request.
    #[error("{service} is unavailable: {message}")]
    Unavailable {
        /// Name of the remote service.
        service: String,
        /// Human-readable failure description.
        message: String,
    },

    /// The service answered but had no match for the query.
    #[error("{service} has no match for '{query}'")]
    NotFound {
        /// Name of the remote service.
        service: String,
        /// Query that produced no result.
        query: String,
    },

    /// The service answered with a payload that could not be interpreted.
    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse {
        /// Name of the remote service.
        service: String,
        /// Description of the problem.
        message: String,
    },
}

impl FetchError {
    /// Returns whether repeating the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
