//! Turns a raw [`SinkConfig`] into the effective settings handed to the
//! delivery engine.
//!
//! Every entry point funnels through [`resolve`]. The raw configuration is
//! never modified, so resolving the same input twice yields equal output.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::buffer::{BufferMode, Limit};
use crate::config::{LogLevel, SinkConfig};
use crate::endpoint::{build_endpoint, local_hostname, parse_ingest_url};
use crate::{Error, Result};

/// Application name used when none is configured.
pub const DEFAULT_APP_NAME: &str = "unknown";

/// In-memory queue limit used when none is configured.
pub const DEFAULT_QUEUE_LIMIT: u64 = 100;

/// Variables consulted, in order, for the environment name.
pub const ENVIRONMENT_VARIABLES: [&str; 2] = ["DOTNET_ENVIRONMENT", "ASPNET_ENVIRONMENT"];

/// Default batch size and flush period, keyed by the entry point family.
///
/// The two families disagree and both are kept so existing callers of
/// either keep their behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Defaults {
    /// The deprecated entry points: 50 events, 15 seconds.
    Legacy,
    /// The current entry points: 1000 events, 2 seconds.
    Current,
}

impl Defaults {
    /// Default maximum events per batch.
    pub fn batch_posting_limit(&self) -> usize {
        match self {
            Self::Legacy => 50,
            Self::Current => 1000,
        }
    }

    /// Default flush period.
    pub fn period(&self) -> Duration {
        match self {
            Self::Legacy => Duration::from_secs(15),
            Self::Current => Duration::from_secs(2),
        }
    }
}

/// Fully resolved settings. Every optional field has been filled.
#[derive(Clone, PartialEq)]
pub struct ResolvedConfig {
    api_key: String,
    /// Application name reported with every line.
    pub app_name: String,
    /// Environment name forwarded to the text formatter.
    pub environment_name: Option<String>,
    /// Ingestion URL including `hostname` and `tags` parameters.
    pub endpoint: String,
    /// Maximum events per batch.
    pub batch_posting_limit: usize,
    /// Maximum events held in memory (volatile mode only).
    pub queue_limit: Limit,
    /// Maximum wait before a partial batch is flushed.
    pub period: Duration,
    /// Events below this severity are dropped.
    pub minimum_level: LogLevel,
    /// Buffer file granularity (durable mode only).
    pub buffer_mode: BufferMode,
    /// Buffer file name pattern (durable mode only).
    pub buffer_path_format: String,
    /// Size cap of a single buffer file (durable mode only).
    pub buffer_file_size_limit_bytes: Limit,
    /// Number of historical buffer files kept (durable mode only).
    pub retained_buffer_file_count_limit: usize,
}

impl ResolvedConfig {
    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("api_key", &"<redacted>")
            .field("app_name", &self.app_name)
            .field("environment_name", &self.environment_name)
            .field("endpoint", &self.endpoint)
            .field("batch_posting_limit", &self.batch_posting_limit)
            .field("queue_limit", &self.queue_limit)
            .field("period", &self.period)
            .field("minimum_level", &self.minimum_level)
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

/// Look up the environment name from the process environment.
pub fn environment_name() -> Option<String> {
    environment_name_from(|key| std::env::var(key).ok())
}

/// Look up the environment name with a custom variable source.
///
/// The first variable in [`ENVIRONMENT_VARIABLES`] with a non-empty value wins.
pub fn environment_name_from<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    ENVIRONMENT_VARIABLES
        .iter()
        .filter_map(|key| lookup(*key))
        .find(|value| !value.trim().is_empty())
}

/// Validate `config` and fill its defaults from `defaults`.
///
/// # Errors
///
/// Returns [`Error::MissingField`] if the API key or ingest URL is blank,
/// [`Error::Config`] if the ingest URL does not parse, and [`Error::Io`]
/// if the local host name cannot be determined.
pub fn resolve(config: &SinkConfig, defaults: Defaults) -> Result<ResolvedConfig> {
    validate(config)?;
    let hostname = local_hostname()?;
    resolve_with(config, defaults, hostname, environment_name())
}

fn validate(config: &SinkConfig) -> Result<()> {
    if config.api_key.trim().is_empty() {
        return Err(Error::MissingField("api_key"));
    }
    if config.ingest_url.trim().is_empty() {
        return Err(Error::MissingField("ingest_url"));
    }
    Ok(())
}

pub(crate) fn resolve_with(
    config: &SinkConfig,
    defaults: Defaults,
    hostname: &str,
    environment_name: Option<String>,
) -> Result<ResolvedConfig> {
    validate(config)?;

    parse_ingest_url(&config.ingest_url)?;
    let endpoint = build_endpoint(&config.ingest_url, hostname, config.tags.as_deref());

    let resolved = ResolvedConfig {
        api_key: config.api_key.clone(),
        app_name: config
            .app_name
            .clone()
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
        environment_name,
        endpoint,
        batch_posting_limit: config
            .batch_posting_limit
            .unwrap_or_else(|| defaults.batch_posting_limit()),
        queue_limit: config
            .queue_limit
            .unwrap_or(Limit::Bounded(DEFAULT_QUEUE_LIMIT)),
        period: config.period.unwrap_or_else(|| defaults.period()),
        minimum_level: config.restricted_to_minimum_level,
        buffer_mode: config.buffer_mode,
        buffer_path_format: config.buffer_path_format.clone(),
        buffer_file_size_limit_bytes: config.buffer_file_size_limit_bytes,
        retained_buffer_file_count_limit: config.retained_buffer_file_count_limit,
    };

    debug!(
        endpoint = %resolved.endpoint,
        app_name = %resolved.app_name,
        batch_posting_limit = resolved.batch_posting_limit,
        period_ms = resolved.period.as_millis() as u64,
        ?defaults,
        "resolved LogDNA sink configuration"
    );

    Ok(resolved)
}
