//! Client logs - browser-side log lines forwarded into a run
//!
//! A page served by a supervised service can stream its console output back
//! as `client_log_batch` frames. Every entry is sanitized here before it
//! reaches the transcript or the history store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Largest frame accepted; bigger frames are dropped unread
pub const MAX_CLIENT_LOG_BYTES: usize = 16 * 1024;

/// Entries accepted in one batch
pub const MAX_CLIENT_LOG_ENTRIES: usize = 50;

/// Characters kept per text field
pub const MAX_CLIENT_LOG_FIELD_CHARS: usize = 2000;

const BATCH_TYPE: &str = "client_log_batch";

/// Console level reported by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientLogLevel {
    /// console.debug
    Debug,
    /// console.log
    Log,
    /// console.info
    Info,
    /// console.warn
    Warn,
    /// console.error
    Error,
}

impl ClientLogLevel {
    /// Returns the string representation of the level
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "debug" => Some(Self::Debug),
            "log" => Some(Self::Log),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Where in the page the entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClientLogSource {
    /// A console method call
    #[serde(rename = "console")]
    Console,
    /// An uncaught `window.onerror`
    #[serde(rename = "window_error")]
    WindowError,
    /// An unhandled promise rejection
    #[serde(rename = "unhandledrejection")]
    UnhandledRejection,
}

impl ClientLogSource {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "console" => Some(Self::Console),
            "window_error" => Some(Self::WindowError),
            "unhandledrejection" => Some(Self::UnhandledRejection),
            _ => None,
        }
    }
}

/// One sanitized browser log line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientLogEntry {
    /// Console level
    pub level: ClientLogLevel,
    /// When the browser logged it
    pub ts: DateTime<Utc>,
    /// Single-line message
    pub message: String,
    /// Page path
    pub path: String,
    /// Origin inside the page
    pub source: ClientLogSource,
    /// Browser tab identifier
    pub client_id: String,
}

impl ClientLogEntry {
    /// Line written into the run's transcript
    #[must_use]
    pub fn terminal_line(&self) -> String {
        format!(
            "\r\n[browser {}] {} {}\r\n",
            self.level.as_str(),
            self.path,
            self.message
        )
    }
}

/// Why a batch was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientLogError {
    /// Not a JSON object
    #[error("Malformed client log payload")]
    Malformed,

    /// `type` is not `client_log_batch`
    #[error("Unsupported client log message type")]
    UnsupportedType,

    /// `entries` missing or not an array
    #[error("Missing entries array")]
    MissingEntries,

    /// More than [`MAX_CLIENT_LOG_ENTRIES`] entries
    #[error("Too many client log entries in one message")]
    TooManyEntries,

    /// An entry that is not an object
    #[error("Invalid client log entry")]
    InvalidEntry,

    /// Unknown level
    #[error("Invalid client log level '{0}'")]
    InvalidLevel(String),

    /// Unknown source
    #[error("Invalid client log source '{0}'")]
    InvalidSource(String),
}

/// Parse and sanitize one `client_log_batch` frame
///
/// The whole batch is refused if any entry is invalid.
pub fn parse_client_log_batch(text: &str) -> Result<Vec<ClientLogEntry>, ClientLogError> {
    let payload: Value = serde_json::from_str(text).map_err(|_| ClientLogError::Malformed)?;
    let Some(payload) = payload.as_object() else {
        return Err(ClientLogError::Malformed);
    };
    if payload.get("type").and_then(Value::as_str) != Some(BATCH_TYPE) {
        return Err(ClientLogError::UnsupportedType);
    }
    let Some(raw_entries) = payload.get("entries").and_then(Value::as_array) else {
        return Err(ClientLogError::MissingEntries);
    };
    if raw_entries.len() > MAX_CLIENT_LOG_ENTRIES {
        return Err(ClientLogError::TooManyEntries);
    }

    raw_entries.iter().map(parse_entry).collect()
}

fn parse_entry(raw: &Value) -> Result<ClientLogEntry, ClientLogError> {
    let Some(entry) = raw.as_object() else {
        return Err(ClientLogError::InvalidEntry);
    };
    let field = |name: &str| sanitize_text(entry.get(name));

    let level = field("level").to_lowercase();
    let level = ClientLogLevel::parse(&level)
        .ok_or_else(|| ClientLogError::InvalidLevel(or_unknown(level)))?;
    let source = field("source").to_lowercase();
    let source = ClientLogSource::parse(&source)
        .ok_or_else(|| ClientLogError::InvalidSource(or_unknown(source)))?;

    let path = field("path");
    let client_id = field("clientId");
    Ok(ClientLogEntry {
        level,
        ts: parse_timestamp(entry.get("ts")),
        message: field("message"),
        path: if path.is_empty() { "/".to_string() } else { path },
        source,
        client_id: if client_id.is_empty() {
            "unknown-client".to_string()
        } else {
            client_id
        },
    })
}

fn or_unknown(value: String) -> String {
    if value.is_empty() {
        "unknown".to_string()
    } else {
        value
    }
}

/// Collapse whitespace to single spaces, trim and cap; non-strings become empty
fn sanitize_text(value: Option<&Value>) -> String {
    let Some(text) = value.and_then(Value::as_str) else {
        return String::new();
    };
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_CLIENT_LOG_FIELD_CHARS)
        .collect()
}

fn parse_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    value
        .and_then(Value::as_str)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts.trim()).ok())
        .map_or_else(Utc::now, |ts| ts.with_timezone(&Utc))
}
