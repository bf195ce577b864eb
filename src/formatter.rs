//! Rendering collaborators handed to the delivery engine.
//!
//! A [`TextFormatter`] turns one [`LogEvent`] into one JSON line, and a
//! [`BatchFormatter`] wraps a group of lines into a request body.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::config::LogLevel;

/// One log event as seen by the formatters.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// When the event happened.
    pub timestamp: OffsetDateTime,
    /// Severity.
    pub level: LogLevel,
    /// Rendered message.
    pub message: String,
    /// Structured fields.
    pub properties: Map<String, Value>,
}

impl LogEvent {
    /// Create an event stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            level,
            message: message.into(),
            properties: Map::new(),
        }
    }

    /// Override the timestamp
    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach a structured field
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Renders a single event.
pub trait TextFormatter: Send + Sync {
    /// Render `event` as one line of the wire format.
    fn format(&self, event: &LogEvent) -> String;
}

/// Wraps rendered lines into one transmittable payload.
pub trait BatchFormatter: Send + Sync {
    /// Build a request body from already-rendered lines.
    fn format(&self, lines: &[String]) -> Bytes;
}

#[derive(Serialize)]
struct Line<'a> {
    timestamp: i64,
    line: &'a str,
    app: &'a str,
    level: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    env: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty")]
    meta: &'a Map<String, Value>,
}

fn is_empty(meta: &&Map<String, Value>) -> bool {
    meta.is_empty()
}

/// LogDNA line format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogdnaTextFormatter {
    app: String,
    env: Option<String>,
}

impl LogdnaTextFormatter {
    /// Create a formatter reporting `app` and, when known, `env`.
    pub fn new(app: impl Into<String>, env: Option<String>) -> Self {
        Self {
            app: app.into(),
            env,
        }
    }

    /// Application name written into every line.
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Environment name written into every line.
    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }
}

impl TextFormatter for LogdnaTextFormatter {
    fn format(&self, event: &LogEvent) -> String {
        let line = Line {
            timestamp: (event.timestamp.unix_timestamp_nanos() / 1_000_000) as i64,
            line: &event.message,
            app: &self.app,
            level: event.level.as_str(),
            env: self.env.as_deref(),
            meta: &event.properties,
        };
        // Only strings, integers and JSON values are serialized here.
        serde_json::to_string(&line).unwrap_or_default()
    }
}

/// LogDNA ingest body: `{"lines":[...]}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogdnaBatchFormatter;

impl BatchFormatter for LogdnaBatchFormatter {
    fn format(&self, lines: &[String]) -> Bytes {
        let size = lines.iter().map(|l| l.len() + 1).sum::<usize>() + 11;
        let mut body = String::with_capacity(size);
        body.push_str(r#"{"lines":["#);
        for (i, line) in lines.iter().filter(|l| !l.trim().is_empty()).enumerate() {
            if i > 0 {
                body.push(',');
            }
            body.push_str(line);
        }
        body.push_str("]}");
        Bytes::from(body)
    }
}
