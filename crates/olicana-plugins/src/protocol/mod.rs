//! IPC protocol types for host-plugin communication.
//!
//! Every control message is one JSON object terminated by a newline. Host
//! requests carry a `method` field; replies carry `result` or `error`; a
//! binary header (`{"type": "binary", "length": N, "storage": ...}`) announces
//! `N` raw bytes of little-endian `f64` values that follow the header line.
//!
//! Records are classified exactly once, by [`Message::decode`] or the
//! transport reader, into the closed [`Message`] union. Nothing downstream
//! inspects raw JSON keys.

mod series;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub use self::series::{BinarySeries, Storage};
pub(crate) use self::series::BinaryHeader;

/// Result payload written when a workflow completes successfully.
pub const INITIALIZED: &str = "initialized";

/// Error payload written when the host cancels a workflow.
pub const CANCELLED: &str = "cancelled";

/// Method names the SDK decodes into dedicated variants.
const KNOWN_METHODS: &[&str] = &[
    "info",
    "initialize",
    "get_chart_config",
    "get_series_config",
    "get_series_data",
    "form_change",
    "show_form",
    "log",
];

/// A single protocol unit exchanged with the host.
///
/// Request variants are what the host sends; reply variants are what the
/// plugin writes back. Both directions share one type so that encoding and
/// decoding are symmetric.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `{"method": "info"}`: asks for the plugin's display name and version.
    Info,
    /// `{"method": "initialize"}`: starts the plugin's configuration dialog.
    Initialize {
        /// Opaque host arguments, if any.
        args: Option<Value>,
    },
    /// `{"method": "get_chart_config"}`.
    GetChartConfig,
    /// `{"method": "get_series_config"}`.
    GetSeriesConfig,
    /// `{"method": "get_series_data"}`.
    GetSeriesData {
        /// Series to return; required by the handler.
        series_id: Option<String>,
        /// Storage layout the host would prefer.
        preferred_storage: Storage,
    },
    /// `{"method": "form_change"}`: live edit of an open form.
    FormChange {
        /// Current form contents.
        data: Value,
    },
    /// A `method` the SDK does not recognise.
    UnknownMethod {
        /// Method name as received.
        method: String,
    },
    /// A known `method` whose arguments have the wrong shape.
    InvalidRequest {
        /// Method name as received.
        method: String,
        /// Why the arguments were rejected.
        reason: String,
        /// The record exactly as received.
        record: Value,
    },
    /// `{"method": "show_form", ...}`: asks the host to render a dialog.
    ShowForm(FormSpec),
    /// `{"method": "log", ...}`: asynchronous, uncorrelated log line.
    Log(LogRecord),
    /// `{name, version}`: reply to [`Message::Info`].
    PluginInfo(PluginInfo),
    /// `{data, schema?, uiSchema?}`: reply to a form change that altered the form.
    FormUpdate(FormUpdate),
    /// `{}`: reply to a form change that altered nothing.
    Ack,
    /// `{result: value}`: success reply, or submitted form input from the host.
    Result(Value),
    /// `{error: message}`: failure reply, or cancellation from the host.
    Error(String),
    /// A binary series frame (header line plus raw payload).
    Binary(BinarySeries),
}

impl Message {
    /// Short label describing the message shape, used in error replies.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Initialize { .. } => "initialize",
            Self::GetChartConfig => "get_chart_config",
            Self::GetSeriesConfig => "get_series_config",
            Self::GetSeriesData { .. } => "get_series_data",
            Self::FormChange { .. } => "form_change",
            Self::UnknownMethod { .. } => "unknown method",
            Self::InvalidRequest { .. } => "invalid request",
            Self::ShowForm(_) => "show_form",
            Self::Log(_) => "log",
            Self::PluginInfo(_) => "plugin info",
            Self::FormUpdate(_) => "form update",
            Self::Ack => "acknowledgement",
            Self::Result(_) => "result",
            Self::Error(_) => "error",
            Self::Binary(_) => "binary",
        }
    }

    /// Serialises the message as a single JSON record without the newline.
    ///
    /// For [`Message::Binary`] only the header record is produced; the payload
    /// travels separately (see [`crate::Transport::write_binary`]).
    ///
    /// # Errors
    ///
    /// Returns an error if a contained JSON value cannot be serialised.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses one control record.
    ///
    /// Returns `None` for anything that is not a well-formed control message,
    /// including binary headers, whose payload only the transport can read.
    #[must_use]
    pub fn decode(line: &str) -> Option<Self> {
        let value = serde_json::from_str::<Value>(line.trim()).ok()?;
        match classify(value)? {
            Record::Control(message) => Some(message),
            Record::BinaryHeader(_) => None,
        }
    }
}

/// Outcome of classifying one decoded JSON record.
pub(crate) enum Record {
    Control(Message),
    BinaryHeader(BinaryHeader),
}

/// Classifies a parsed JSON record into a protocol shape.
///
/// A `method` key takes precedence, then the binary header, then `error`,
/// then `result`. Records matching no shape yield `None`.
pub(crate) fn classify(value: Value) -> Option<Record> {
    let Value::Object(mut map) = value else {
        return None;
    };

    if let Some(method) = map.get("method") {
        let name = method.as_str()?.to_owned();
        if !KNOWN_METHODS.contains(&name.as_str()) {
            return Some(Record::Control(Message::UnknownMethod { method: name }));
        }
        let record = Value::Object(map);
        let message = match MethodRecord::deserialize(&record) {
            Ok(decoded) => decoded.into(),
            Err(err) => Message::InvalidRequest {
                method: name,
                reason: err.to_string(),
                record,
            },
        };
        return Some(Record::Control(message));
    }

    if map.get("type").and_then(Value::as_str) == Some("binary") {
        let header: BinaryHeader = serde_json::from_value(Value::Object(map)).ok()?;
        return Some(Record::BinaryHeader(header));
    }

    if let Some(error) = map.remove("error") {
        return Some(Record::Control(Message::Error(error_text(error))));
    }

    if let Some(result) = map.remove("result") {
        return Some(Record::Control(Message::Result(result)));
    }

    if map.is_empty() {
        return Some(Record::Control(Message::Ack));
    }

    classify_reply(map).map(Record::Control)
}

fn classify_reply(map: Map<String, Value>) -> Option<Message> {
    if map.contains_key("name") && map.contains_key("version") {
        return serde_json::from_value(Value::Object(map))
            .ok()
            .map(Message::PluginInfo);
    }

    if ["data", "schema", "uiSchema"]
        .iter()
        .any(|key| map.contains_key(*key))
    {
        return serde_json::from_value(Value::Object(map))
            .ok()
            .map(Message::FormUpdate);
    }

    None
}

fn error_text(error: Value) -> String {
    match error {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Info => MethodRef::Info.serialize(serializer),
            Self::Initialize { args } => MethodRef::Initialize {
                args: args.as_ref(),
            }
            .serialize(serializer),
            Self::GetChartConfig => MethodRef::GetChartConfig.serialize(serializer),
            Self::GetSeriesConfig => MethodRef::GetSeriesConfig.serialize(serializer),
            Self::GetSeriesData {
                series_id,
                preferred_storage,
            } => MethodRef::GetSeriesData {
                series_id: series_id.as_deref(),
                preferred_storage: *preferred_storage,
            }
            .serialize(serializer),
            Self::FormChange { data } => MethodRef::FormChange { data }.serialize(serializer),
            Self::UnknownMethod { method } => UnknownRef { method }.serialize(serializer),
            Self::InvalidRequest { record, .. } => record.serialize(serializer),
            Self::ShowForm(form) => MethodRef::ShowForm(form).serialize(serializer),
            Self::Log(record) => MethodRef::Log(record).serialize(serializer),
            Self::PluginInfo(info) => info.serialize(serializer),
            Self::FormUpdate(update) => update.serialize(serializer),
            Self::Ack => serializer.serialize_map(Some(0))?.end(),
            Self::Result(result) => ResultRef { result }.serialize(serializer),
            Self::Error(error) => ErrorRef { error }.serialize(serializer),
            Self::Binary(series) => series.header().serialize(serializer),
        }
    }
}

/// Inbound shape of every method-tagged record.
#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
enum MethodRecord {
    Info,
    Initialize {
        #[serde(default, deserialize_with = "present")]
        args: Option<Value>,
    },
    GetChartConfig,
    GetSeriesConfig,
    GetSeriesData {
        #[serde(default)]
        series_id: Option<String>,
        #[serde(default, deserialize_with = "lenient_storage")]
        preferred_storage: Storage,
    },
    FormChange {
        #[serde(default)]
        data: Value,
    },
    ShowForm(FormSpec),
    Log(LogRecord),
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only an absent field is `None`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Reads a storage preference, falling back to interleaved for unknown layouts.
fn lenient_storage<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Storage, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(Storage::deserialize(&value).unwrap_or_default())
}

impl From<MethodRecord> for Message {
    fn from(record: MethodRecord) -> Self {
        match record {
            MethodRecord::Info => Self::Info,
            MethodRecord::Initialize { args } => Self::Initialize { args },
            MethodRecord::GetChartConfig => Self::GetChartConfig,
            MethodRecord::GetSeriesConfig => Self::GetSeriesConfig,
            MethodRecord::GetSeriesData {
                series_id,
                preferred_storage,
            } => Self::GetSeriesData {
                series_id,
                preferred_storage,
            },
            MethodRecord::FormChange { data } => Self::FormChange { data },
            MethodRecord::ShowForm(form) => Self::ShowForm(form),
            MethodRecord::Log(record) => Self::Log(record),
        }
    }
}

/// Outbound, borrowing twin of [`MethodRecord`].
#[derive(Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
enum MethodRef<'a> {
    Info,
    Initialize {
        #[serde(skip_serializing_if = "Option::is_none")]
        args: Option<&'a Value>,
    },
    GetChartConfig,
    GetSeriesConfig,
    GetSeriesData {
        #[serde(skip_serializing_if = "Option::is_none")]
        series_id: Option<&'a str>,
        preferred_storage: Storage,
    },
    FormChange {
        data: &'a Value,
    },
    ShowForm(&'a FormSpec),
    Log(&'a LogRecord),
}

#[derive(Serialize)]
struct UnknownRef<'a> {
    method: &'a str,
}

#[derive(Serialize)]
struct ResultRef<'a> {
    result: &'a Value,
}

#[derive(Serialize)]
struct ErrorRef<'a> {
    error: &'a str,
}

/// A dialog the host should render on the plugin's behalf.
///
/// The schema and UI hints are opaque to the SDK; they are passed through to
/// the host's form renderer unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSpec {
    title: String,
    schema: Value,
    #[serde(rename = "uiSchema", default)]
    ui_schema: Value,
    #[serde(default)]
    handle_form_change: bool,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    data: Option<Value>,
}

impl FormSpec {
    /// Creates a form without prefill data and without live change callbacks.
    #[must_use]
    pub fn new(title: impl Into<String>, schema: Value, ui_schema: Value) -> Self {
        Self {
            title: title.into(),
            schema,
            ui_schema,
            handle_form_change: false,
            data: None,
        }
    }

    /// Attaches prefill values.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Asks the host to send `form_change` callbacks while the form is open.
    #[must_use]
    pub const fn with_form_change(mut self) -> Self {
        self.handle_form_change = true;
        self
    }

    /// Returns the dialog title.
    #[must_use]
    pub const fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Returns the JSON schema.
    #[must_use]
    pub const fn schema(&self) -> &Value {
        &self.schema
    }

    /// Returns the UI hints.
    #[must_use]
    pub const fn ui_schema(&self) -> &Value {
        &self.ui_schema
    }

    /// Returns whether the host should send `form_change` callbacks.
    #[must_use]
    pub const fn handles_form_change(&self) -> bool {
        self.handle_form_change
    }

    /// Returns the prefill values, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

/// Reply to a `form_change` that altered what the host should display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormUpdate {
    #[serde(default)]
    data: Value,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    schema: Option<Value>,
    #[serde(
        rename = "uiSchema",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    ui_schema: Option<Value>,
}

impl FormUpdate {
    /// Creates an update that only replaces the form data.
    #[must_use]
    pub const fn new(data: Value) -> Self {
        Self {
            data,
            schema: None,
            ui_schema: None,
        }
    }

    /// Also replaces the schema and UI hints.
    #[must_use]
    pub fn with_schema(mut self, schema: Value, ui_schema: Value) -> Self {
        self.schema = Some(schema);
        self.ui_schema = Some(ui_schema);
        self
    }

    /// Returns the replacement form data.
    #[must_use]
    pub const fn values(&self) -> &Value {
        &self.data
    }
}

/// Severity of an asynchronous log line shown by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Progress information.
    Info,
    /// Recoverable problem.
    Warn,
    /// Failure.
    Error,
}

/// Body of a `{"method": "log"}` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    level: LogLevel,
    message: String,
}

impl LogRecord {
    /// Creates a log record.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Returns the severity.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// Returns the text.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Reply to an `info` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    name: String,
    version: u32,
}

impl PluginInfo {
    /// Creates plugin identification.
    #[must_use]
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Returns the display name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the protocol-visible version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }
}
