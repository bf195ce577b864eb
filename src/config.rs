use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::time::Duration;

use crate::buffer::{
    BufferMode, DEFAULT_BUFFER_PATH_FORMAT, DEFAULT_RETAINED_BUFFER_FILE_COUNT, Limit,
    deserialize_byte_limit,
};

/// LogDNA ingestion endpoint used when none is configured.
pub const DEFAULT_INGEST_URL: &str = "https://logs.logdna.com/logs/ingest";

/// Severity of a log event, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Everything, including tracing noise.
    #[default]
    #[serde(alias = "trace")]
    Verbose,
    /// Internal diagnostics.
    Debug,
    /// Normal operation.
    #[serde(alias = "info")]
    Information,
    /// Something unexpected, but recoverable.
    #[serde(alias = "warn")]
    Warning,
    /// An operation failed.
    Error,
    /// The process cannot continue.
    Fatal,
}

impl LogLevel {
    /// The lowest severity; every event passes a filter set to this.
    pub const MINIMUM: LogLevel = LogLevel::Verbose;

    /// Upper-case name as it appears in LogDNA lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verbose => "TRACE",
            Self::Debug => "DEBUG",
            Self::Information => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Self::Verbose,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Information,
            tracing::Level::WARN => Self::Warning,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a caller can say about a LogDNA delivery target.
///
/// Optional fields left as `None` are filled by the resolver with the
/// defaults of the entry point that was called.
#[derive(Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Ingestion key. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Application name reported with every line.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Comma-separated tags attached to the ingestion URL.
    #[serde(default)]
    pub tags: Option<String>,
    /// Base ingestion endpoint.
    #[serde(default = "default_ingest_url")]
    pub ingest_url: String,
    /// Maximum events per batch.
    #[serde(default)]
    pub batch_posting_limit: Option<usize>,
    /// Maximum events held in memory (volatile mode only).
    #[serde(default)]
    pub queue_limit: Option<Limit>,
    /// Maximum wait before a partial batch is flushed.
    #[serde(
        default,
        rename = "period_secs",
        serialize_with = "serialize_period",
        deserialize_with = "deserialize_period"
    )]
    pub period: Option<Duration>,
    /// Events below this severity are dropped.
    #[serde(default)]
    pub restricted_to_minimum_level: LogLevel,
    /// Buffer file granularity (durable mode only).
    #[serde(default)]
    pub buffer_mode: BufferMode,
    /// Buffer file name pattern (durable mode only).
    #[serde(default = "default_buffer_path_format")]
    pub buffer_path_format: String,
    /// Size cap of a single buffer file (durable mode only).
    #[serde(default, deserialize_with = "deserialize_byte_limit")]
    pub buffer_file_size_limit_bytes: Limit,
    /// Number of historical buffer files kept (durable mode only).
    #[serde(default = "default_retained_buffer_file_count_limit")]
    pub retained_buffer_file_count_limit: usize,
}

impl SinkConfig {
    /// Create a new SinkConfig for the given API key with defaults
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the application name
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Set the comma-separated tag list
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Set the ingestion URL
    pub fn with_ingest_url(mut self, ingest_url: impl Into<String>) -> Self {
        self.ingest_url = ingest_url.into();
        self
    }

    /// Set the batch size limit
    pub fn with_batch_posting_limit(mut self, limit: usize) -> Self {
        self.batch_posting_limit = Some(limit);
        self
    }

    /// Set the in-memory queue limit
    pub fn with_queue_limit(mut self, limit: impl Into<Limit>) -> Self {
        self.queue_limit = Some(limit.into());
        self
    }

    /// Set the flush period
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    /// Set the minimum severity
    pub fn with_minimum_level(mut self, level: LogLevel) -> Self {
        self.restricted_to_minimum_level = level;
        self
    }

    /// Set the buffer mode
    pub fn with_buffer_mode(mut self, mode: BufferMode) -> Self {
        self.buffer_mode = mode;
        self
    }

    /// Set the buffer file pattern
    pub fn with_buffer_path_format(mut self, format: impl Into<String>) -> Self {
        self.buffer_path_format = format.into();
        self
    }

    /// Set the buffer file size cap
    pub fn with_buffer_file_size_limit(mut self, limit: impl Into<Limit>) -> Self {
        self.buffer_file_size_limit_bytes = limit.into();
        self
    }

    /// Set the number of retained buffer files
    pub fn with_retained_buffer_file_count_limit(mut self, count: usize) -> Self {
        self.retained_buffer_file_count_limit = count;
        self
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            app_name: None,
            tags: None,
            ingest_url: default_ingest_url(),
            batch_posting_limit: None,
            queue_limit: None,
            period: None,
            restricted_to_minimum_level: LogLevel::MINIMUM,
            buffer_mode: BufferMode::default(),
            buffer_path_format: default_buffer_path_format(),
            buffer_file_size_limit_bytes: Limit::Unbounded,
            retained_buffer_file_count_limit: default_retained_buffer_file_count_limit(),
        }
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("api_key", &"<redacted>")
            .field("app_name", &self.app_name)
            .field("tags", &self.tags)
            .field("ingest_url", &self.ingest_url)
            .field("batch_posting_limit", &self.batch_posting_limit)
            .field("queue_limit", &self.queue_limit)
            .field("period", &self.period)
            .field("restricted_to_minimum_level", &self.restricted_to_minimum_level)
            .field("buffer_mode", &self.buffer_mode)
            .field("buffer_path_format", &self.buffer_path_format)
            .field("buffer_file_size_limit_bytes", &self.buffer_file_size_limit_bytes)
            .field(
                "retained_buffer_file_count_limit",
                &self.retained_buffer_file_count_limit,
            )
            .finish()
    }
}

fn default_ingest_url() -> String {
    DEFAULT_INGEST_URL.to_string()
}

fn default_buffer_path_format() -> String {
    DEFAULT_BUFFER_PATH_FORMAT.to_string()
}

fn default_retained_buffer_file_count_limit() -> usize {
    DEFAULT_RETAINED_BUFFER_FILE_COUNT
}

fn serialize_period<S: Serializer>(
    period: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match period {
        Some(period) => serializer.serialize_some(&period.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_period<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .map_err(|e| de::Error::custom(format!("invalid period_secs {}: {}", secs, e)))
        })
        .transpose()
}
