//! Hybrid line/binary framing over a byte stream.
//!
//! [`Transport`] owns both halves of the host connection. Control messages
//! are written as one JSON record per line and flushed immediately. Series
//! data is written as a header line, flushed, then followed by the raw
//! payload bytes and flushed again.
//!
//! Reading is deliberately permissive: a closed stream, a malformed line, or
//! a truncated binary payload all read as end of stream. A corrupted stream
//! is never resynchronised.

use std::io::{BufRead, ErrorKind, Read, Write};

use tracing::{debug, warn};

use crate::error::TransportError;
use crate::protocol::{
    BinaryHeader, BinarySeries, LogLevel, LogRecord, Message, Record, classify,
};

/// Tracing target for transport operations.
const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Largest binary payload the reader accepts.
const MAX_PAYLOAD_BYTES: usize = 1 << 28;

/// Framed connection to the host.
///
/// `R` is the host's output (the plugin's stdin) and `W` the host's input
/// (the plugin's stdout).
#[derive(Debug)]
pub struct Transport<R, W> {
    reader: R,
    writer: W,
    deferred: Option<TransportError>,
}

impl<R, W> Transport<R, W> {
    /// Wraps a reader and writer.
    #[must_use]
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            deferred: None,
        }
    }

    /// Releases the underlying reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Returns a log write failure that has not been surfaced yet.
    pub const fn take_deferred(&mut self) -> Option<TransportError> {
        self.deferred.take()
    }
}

impl<R: BufRead, W> Transport<R, W> {
    /// Blocks until the next message is available.
    ///
    /// Returns `Ok(None)` at end of stream and on any framing error, which
    /// ends the conversation.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Read`] when the underlying reader fails for a
    /// reason other than invalid data.
    pub fn read(&mut self) -> Result<Option<Message>, TransportError> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => {
                debug!(target: TRANSPORT_TARGET, "host closed the stream");
                return Ok(None);
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                warn!(target: TRANSPORT_TARGET, error = %err, "host sent a non-UTF-8 line");
                return Ok(None);
            }
            Err(err) => return Err(TransportError::read(err)),
        }

        let Some(record) = serde_json::from_str::<serde_json::Value>(line.trim())
            .ok()
            .and_then(classify)
        else {
            warn!(
                target: TRANSPORT_TARGET,
                line_bytes = line.len(),
                "malformed record, treating as end of stream"
            );
            return Ok(None);
        };

        match record {
            Record::Control(message) => {
                debug!(target: TRANSPORT_TARGET, kind = message.kind(), "read message");
                Ok(Some(message))
            }
            Record::BinaryHeader(header) => self.read_payload(header),
        }
    }

    fn read_payload(&mut self, header: BinaryHeader) -> Result<Option<Message>, TransportError> {
        let length = header.length();
        if length > MAX_PAYLOAD_BYTES {
            warn!(target: TRANSPORT_TARGET, length, "binary payload exceeds limit");
            return Ok(None);
        }

        let limit = u64::try_from(length).unwrap_or(u64::MAX);
        let mut payload = Vec::new();
        self.reader
            .by_ref()
            .take(limit)
            .read_to_end(&mut payload)
            .map_err(TransportError::read)?;
        if payload.len() < length {
            warn!(
                target: TRANSPORT_TARGET,
                length,
                received = payload.len(),
                "binary payload truncated"
            );
            return Ok(None);
        }

        let Some(series) = BinarySeries::from_le_bytes(header.storage(), &payload) else {
            warn!(target: TRANSPORT_TARGET, length, "binary payload is not a whole series");
            return Ok(None);
        };
        debug!(target: TRANSPORT_TARGET, length, "read binary series");
        Ok(Some(Message::Binary(series)))
    }
}

impl<R, W: Write> Transport<R, W> {
    /// Writes any message, choosing the binary framing for series data.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or the write fails, or if an earlier
    /// log write failed.
    pub fn write(&mut self, message: &Message) -> Result<(), TransportError> {
        match message {
            Message::Binary(series) => self.write_binary(series),
            other => self.write_control(other),
        }
    }

    /// Writes one control record followed by a newline and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BinaryAsControl`] for series data, a
    /// deferred log failure if one is pending, or the serialisation or write
    /// failure.
    pub fn write_control(&mut self, message: &Message) -> Result<(), TransportError> {
        if matches!(message, Message::Binary(_)) {
            return Err(TransportError::BinaryAsControl);
        }
        self.surface_deferred()?;
        self.write_record(message)
    }

    /// Writes a binary header line, flushes, then writes the payload bytes
    /// and flushes again.
    ///
    /// # Errors
    ///
    /// Returns a deferred log failure if one is pending, or the write failure.
    pub fn write_binary(&mut self, series: &BinarySeries) -> Result<(), TransportError> {
        self.surface_deferred()?;
        let header = serde_json::to_string(&series.header()).map_err(TransportError::Serialize)?;
        self.write_line(&header)?;
        self.writer
            .write_all(&series.to_le_bytes())
            .map_err(TransportError::write)?;
        self.writer.flush().map_err(TransportError::write)?;
        debug!(
            target: TRANSPORT_TARGET,
            length = series.byte_len(),
            "wrote binary series"
        );
        Ok(())
    }

    /// Writes an asynchronous `log` record.
    ///
    /// # Errors
    ///
    /// Returns the serialisation or write failure.
    pub fn emit_log(&mut self, level: LogLevel, message: &str) -> Result<(), TransportError> {
        self.write_record(&Message::Log(LogRecord::new(level, message)))
    }

    fn surface_deferred(&mut self) -> Result<(), TransportError> {
        self.deferred.take().map_or(Ok(()), Err)
    }

    fn write_record(&mut self, message: &Message) -> Result<(), TransportError> {
        let line = message.encode().map_err(TransportError::Serialize)?;
        self.write_line(&line)?;
        debug!(target: TRANSPORT_TARGET, kind = message.kind(), "wrote message");
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.writer
            .write_all(line.as_bytes())
            .map_err(TransportError::write)?;
        self.writer.write_all(b"\n").map_err(TransportError::write)?;
        self.writer.flush().map_err(TransportError::write)
    }
}

/// Capability for emitting user-facing progress messages during a workflow.
///
/// Log lines never end a turn. Implementations must not fail the caller; a
/// failed write is reported later through the normal reply path.
pub trait LogSink {
    /// Emits one message at `level`.
    fn log(&mut self, level: LogLevel, message: &str);

    /// Emits a debug message.
    fn debug(&mut self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Emits an informational message.
    fn info(&mut self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Emits a warning.
    fn warn(&mut self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Emits an error message.
    fn error(&mut self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

impl<R, W: Write> LogSink for Transport<R, W> {
    fn log(&mut self, level: LogLevel, message: &str) {
        if self.deferred.is_some() {
            return;
        }
        if let Err(err) = self.emit_log(level, message) {
            warn!(target: TRANSPORT_TARGET, error = %err, "deferring log write failure");
            self.deferred = Some(err);
        }
    }
}
