//! Scripted host for exercising plugins without a real host process.
//!
//! Enabled by the `test-support` feature so plugin crates can drive their
//! sessions and workflows from unit and behaviour tests.

use std::io::Cursor;

use serde_json::{Value, json};

use crate::protocol::{LogLevel, LogRecord, Message};
use crate::transport::{LogSink, Transport};

/// Transport reading from a prepared script and writing into memory.
pub type ScriptedTransport = Transport<Cursor<Vec<u8>>, Vec<u8>>;

/// Builder for the byte stream a host would send.
#[derive(Debug, Default, Clone)]
pub struct ScriptedHost {
    input: Vec<u8>,
}

impl ScriptedHost {
    /// Starts an empty script.
    #[must_use]
    pub const fn new() -> Self {
        Self { input: Vec::new() }
    }

    /// Appends `{"method": name}`.
    #[must_use]
    pub fn request(self, method: &str) -> Self {
        self.record(&json!({ "method": method }))
    }

    /// Appends a `get_series_data` request for `series_id`.
    #[must_use]
    pub fn series_request(self, series_id: &str) -> Self {
        self.record(&json!({ "method": "get_series_data", "series_id": series_id }))
    }

    /// Appends a form submission.
    #[must_use]
    pub fn submit(self, result: Value) -> Self {
        self.record(&json!({ "result": result }))
    }

    /// Appends a cancellation.
    #[must_use]
    pub fn cancel(self) -> Self {
        self.record(&json!({ "error": "cancelled" }))
    }

    /// Appends a live form edit.
    #[must_use]
    pub fn form_change(self, data: Value) -> Self {
        self.record(&json!({ "method": "form_change", "data": data }))
    }

    /// Appends one JSON record.
    #[must_use]
    pub fn record(self, record: &Value) -> Self {
        self.line(&record.to_string())
    }

    /// Appends a raw line, which need not be valid JSON.
    #[must_use]
    pub fn line(mut self, raw: &str) -> Self {
        self.input.extend_from_slice(raw.as_bytes());
        self.input.push(b'\n');
        self
    }

    /// Returns the script as bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.input
    }

    /// Builds a transport that replays the script.
    #[must_use]
    pub fn transport(self) -> ScriptedTransport {
        Transport::new(Cursor::new(self.input), Vec::new())
    }
}

/// Decodes everything a plugin wrote, binary frames included.
///
/// Stops at the first record that does not decode.
#[must_use]
pub fn decode_all(bytes: &[u8]) -> Vec<Message> {
    let mut transport = Transport::new(bytes, std::io::sink());
    let mut messages = Vec::new();
    while let Ok(Some(message)) = transport.read() {
        messages.push(message);
    }
    messages
}

/// Decodes the messages a scripted transport wrote.
#[must_use]
pub fn replies(transport: ScriptedTransport) -> Vec<Message> {
    let (_, written) = transport.into_parts();
    decode_all(&written)
}

/// Returns the messages in `messages` that are not `log` records.
#[must_use]
pub fn without_logs(messages: Vec<Message>) -> Vec<Message> {
    messages
        .into_iter()
        .filter(|message| !matches!(message, Message::Log(_)))
        .collect()
}

/// [`LogSink`] that records every line.
#[derive(Debug, Default, Clone)]
pub struct RecordingLog {
    records: Vec<LogRecord>,
}

impl RecordingLog {
    /// Returns the recorded lines in order.
    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Returns whether any line at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records
            .iter()
            .any(|record| record.level() == level && record.message().contains(needle))
    }
}

impl LogSink for RecordingLog {
    fn log(&mut self, level: LogLevel, message: &str) {
        self.records.push(LogRecord::new(level, message));
    }
}
