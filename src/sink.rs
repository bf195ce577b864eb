//! Sink registration entry points.
//!
//! A [`DeliveryEngine`] is the batching, queueing and disk-buffering layer
//! that actually ships batches. [`LogdnaSinkExt`] adds the LogDNA entry
//! points to any engine. All of them go through the same resolve and
//! select steps and only differ in how the caller supplies configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use logdna_sink::{DeliveryEngine, DurableParams, LogdnaSinkExt, VolatileParams};
//!
//! struct Engine;
//!
//! impl DeliveryEngine for Engine {
//!     type Output = ();
//!     fn http(&mut self, _params: VolatileParams) {}
//!     fn durable_http(&mut self, _params: DurableParams) {}
//! }
//!
//! Engine.write_to_logdna(|config| {
//!     config.api_key = "my-ingestion-key".to_string();
//!     config.app_name = Some("checkout".to_string());
//! })?;
//! # Ok::<(), logdna_sink::Error>(())
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::Result;
use crate::buffer::{
    BufferMode, DEFAULT_BUFFER_PATH_FORMAT, DEFAULT_RETAINED_BUFFER_FILE_COUNT, Limit,
};
use crate::config::{DEFAULT_INGEST_URL, LogLevel, SinkConfig};
use crate::formatter::{BatchFormatter, TextFormatter};
use crate::resolver::{Defaults, resolve};
use crate::transport::{
    self, DeliveryMode, DurableParams, FormatterOverrides, TransportPlan, VolatileParams,
};

/// The batching layer that owns scheduling, retries and buffer files.
pub trait DeliveryEngine {
    /// What registering a sink produces, e.g. a handle or a layer.
    type Output;

    /// Register in-memory delivery.
    fn http(&mut self, params: VolatileParams) -> Self::Output;

    /// Register disk-buffered delivery.
    fn durable_http(&mut self, params: DurableParams) -> Self::Output;
}

/// Named arguments for [`LogdnaSinkExt::http_logdna`].
#[derive(Clone)]
pub struct HttpLogdnaArgs {
    /// LogDNA ingestion key. Required.
    pub api_key: String,
    /// Application name reported with every line; `"unknown"` when unset.
    pub app_name: Option<String>,
    /// Comma-separated tags sent as the `tags` query parameter.
    pub tags: Option<String>,
    /// Base ingestion URL.
    pub request_uri: String,
    /// Maximum events per batch.
    pub batch_posting_limit: usize,
    /// In-memory queue cap; 100 events when unset.
    pub queue_limit: Option<Limit>,
    /// Maximum wait before a partial batch is flushed; 2 seconds when unset.
    pub period: Option<Duration>,
    /// Replaces the LogDNA line renderer.
    pub text_formatter: Option<Arc<dyn TextFormatter>>,
    /// Replaces the `{"lines":[...]}` body wrapper.
    pub batch_formatter: Option<Arc<dyn BatchFormatter>>,
    /// Events below this severity are dropped.
    pub restricted_to_minimum_level: LogLevel,
}

impl Default for HttpLogdnaArgs {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            app_name: None,
            tags: None,
            request_uri: DEFAULT_INGEST_URL.to_string(),
            batch_posting_limit: Defaults::Current.batch_posting_limit(),
            queue_limit: None,
            period: None,
            text_formatter: None,
            batch_formatter: None,
            restricted_to_minimum_level: LogLevel::MINIMUM,
        }
    }
}

impl HttpLogdnaArgs {
    fn split(self) -> (SinkConfig, FormatterOverrides) {
        let config = SinkConfig {
            api_key: self.api_key,
            app_name: self.app_name,
            tags: self.tags,
            ingest_url: self.request_uri,
            batch_posting_limit: Some(self.batch_posting_limit),
            queue_limit: self.queue_limit,
            period: self.period,
            restricted_to_minimum_level: self.restricted_to_minimum_level,
            ..SinkConfig::default()
        };
        let overrides = FormatterOverrides {
            text: self.text_formatter,
            batch: self.batch_formatter,
        };
        (config, overrides)
    }
}

/// Named arguments for [`LogdnaSinkExt::durable_http_logdna`].
#[derive(Clone)]
pub struct DurableHttpLogdnaArgs {
    /// LogDNA ingestion key. Required.
    pub api_key: String,
    /// Application name reported with every line; `"unknown"` when unset.
    pub app_name: Option<String>,
    /// Comma-separated tags sent as the `tags` query parameter.
    pub tags: Option<String>,
    /// Base ingestion URL.
    pub request_uri: String,
    /// Buffer file name pattern with a `{Date}`, `{HalfHour}` or `{Hour}` placeholder.
    pub buffer_path_format: String,
    /// Size cap of a single buffer file.
    pub buffer_file_size_limit_bytes: Limit,
    /// Number of historical buffer files kept.
    pub retained_buffer_file_count_limit: usize,
    /// Maximum events per batch.
    pub batch_posting_limit: usize,
    /// Maximum wait before a partial batch is flushed; 2 seconds when unset.
    pub period: Option<Duration>,
    /// Replaces the LogDNA line renderer.
    pub text_formatter: Option<Arc<dyn TextFormatter>>,
    /// Replaces the `{"lines":[...]}` body wrapper.
    pub batch_formatter: Option<Arc<dyn BatchFormatter>>,
    /// Events below this severity are dropped.
    pub restricted_to_minimum_level: LogLevel,
}

impl Default for DurableHttpLogdnaArgs {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            app_name: None,
            tags: None,
            request_uri: DEFAULT_INGEST_URL.to_string(),
            buffer_path_format: DEFAULT_BUFFER_PATH_FORMAT.to_string(),
            buffer_file_size_limit_bytes: Limit::Unbounded,
            retained_buffer_file_count_limit: DEFAULT_RETAINED_BUFFER_FILE_COUNT,
            batch_posting_limit: Defaults::Current.batch_posting_limit(),
            period: None,
            text_formatter: None,
            batch_formatter: None,
            restricted_to_minimum_level: LogLevel::MINIMUM,
        }
    }
}

impl DurableHttpLogdnaArgs {
    fn split(self) -> (SinkConfig, FormatterOverrides) {
        let config = SinkConfig {
            api_key: self.api_key,
            app_name: self.app_name,
            tags: self.tags,
            ingest_url: self.request_uri,
            batch_posting_limit: Some(self.batch_posting_limit),
            period: self.period,
            restricted_to_minimum_level: self.restricted_to_minimum_level,
            buffer_path_format: self.buffer_path_format,
            buffer_file_size_limit_bytes: self.buffer_file_size_limit_bytes,
            retained_buffer_file_count_limit: self.retained_buffer_file_count_limit,
            ..SinkConfig::default()
        };
        let overrides = FormatterOverrides {
            text: self.text_formatter,
            batch: self.batch_formatter,
        };
        (config, overrides)
    }
}

/// Named arguments for the deprecated [`LogdnaSinkExt::logdna`].
#[derive(Clone)]
pub struct LogdnaArgs {
    /// LogDNA ingestion key. Required.
    pub api_key: String,
    /// Application name reported with every line; `"unknown"` when unset.
    pub app_name: Option<String>,
    /// Comma-separated tags sent as the `tags` query parameter.
    pub tags: Option<String>,
    /// Base ingestion URL.
    pub ingest_url: String,
    /// Maximum events per batch; 50 when unset.
    pub batch_posting_limit: Option<usize>,
    /// In-memory queue cap; 100 events when unset.
    pub queue_limit: Option<Limit>,
    /// Maximum wait before a partial batch is flushed; 15 seconds when unset.
    pub period: Option<Duration>,
    /// Events below this severity are dropped.
    pub restricted_to_minimum_level: LogLevel,
}

impl Default for LogdnaArgs {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            app_name: None,
            tags: None,
            ingest_url: DEFAULT_INGEST_URL.to_string(),
            batch_posting_limit: None,
            queue_limit: None,
            period: None,
            restricted_to_minimum_level: LogLevel::MINIMUM,
        }
    }
}

impl fmt::Debug for LogdnaArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogdnaArgs")
            .field("api_key", &"<redacted>")
            .field("app_name", &self.app_name)
            .field("tags", &self.tags)
            .field("ingest_url", &self.ingest_url)
            .field("batch_posting_limit", &self.batch_posting_limit)
            .field("queue_limit", &self.queue_limit)
            .field("period", &self.period)
            .field("restricted_to_minimum_level", &self.restricted_to_minimum_level)
            .finish()
    }
}

impl From<LogdnaArgs> for SinkConfig {
    fn from(args: LogdnaArgs) -> Self {
        SinkConfig {
            api_key: args.api_key,
            app_name: args.app_name,
            tags: args.tags,
            ingest_url: args.ingest_url,
            batch_posting_limit: args.batch_posting_limit,
            queue_limit: args.queue_limit,
            period: args.period,
            restricted_to_minimum_level: args.restricted_to_minimum_level,
            ..SinkConfig::default()
        }
    }
}

/// Named arguments for the deprecated [`LogdnaSinkExt::sink_logdna_with`].
#[derive(Clone)]
pub struct SinkLogdnaArgs {
    /// LogDNA ingestion key. Required.
    pub api_key: String,
    /// Application name reported with every line; `"unknown"` when unset.
    pub app_name: Option<String>,
    /// Comma-separated tags sent as the `tags` query parameter.
    pub tags: Option<String>,
    /// Base ingestion URL.
    pub ingest_url: String,
    /// Maximum events per batch; 50 when unset.
    pub batch_posting_limit: Option<usize>,
    /// Maximum wait before a partial batch is flushed; 15 seconds when unset.
    pub period: Option<Duration>,
    /// Events below this severity are dropped.
    pub restricted_to_minimum_level: LogLevel,
    /// Buffer file granularity; also picks the file name pattern.
    pub buffer_mode: BufferMode,
}

impl Default for SinkLogdnaArgs {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            app_name: None,
            tags: None,
            ingest_url: DEFAULT_INGEST_URL.to_string(),
            batch_posting_limit: None,
            period: None,
            restricted_to_minimum_level: LogLevel::MINIMUM,
            buffer_mode: BufferMode::Hour,
        }
    }
}

impl fmt::Debug for SinkLogdnaArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkLogdnaArgs")
            .field("api_key", &"<redacted>")
            .field("app_name", &self.app_name)
            .field("tags", &self.tags)
            .field("ingest_url", &self.ingest_url)
            .field("batch_posting_limit", &self.batch_posting_limit)
            .field("period", &self.period)
            .field("restricted_to_minimum_level", &self.restricted_to_minimum_level)
            .field("buffer_mode", &self.buffer_mode)
            .finish()
    }
}

impl From<SinkLogdnaArgs> for SinkConfig {
    fn from(args: SinkLogdnaArgs) -> Self {
        SinkConfig {
            api_key: args.api_key,
            app_name: args.app_name,
            tags: args.tags,
            ingest_url: args.ingest_url,
            batch_posting_limit: args.batch_posting_limit,
            period: args.period,
            restricted_to_minimum_level: args.restricted_to_minimum_level,
            buffer_mode: args.buffer_mode,
            ..SinkConfig::default()
        }
    }
}

fn register<E>(
    engine: &mut E,
    config: &SinkConfig,
    defaults: Defaults,
    mode: DeliveryMode,
    overrides: FormatterOverrides,
) -> Result<E::Output>
where
    E: DeliveryEngine + ?Sized,
{
    let resolved = resolve(config, defaults)?;
    let output = match transport::select(&resolved, mode, overrides)? {
        TransportPlan::Volatile(params) => engine.http(params),
        TransportPlan::Durable(params) => engine.durable_http(params),
    };
    Ok(output)
}

/// LogDNA entry points for any [`DeliveryEngine`].
///
/// Configuration errors are returned before the engine is called.
pub trait LogdnaSinkExt: DeliveryEngine {
    /// Volatile delivery, configured through a callback.
    fn write_to_logdna<F>(&mut self, configure: F) -> Result<Self::Output>
    where
        F: FnOnce(&mut SinkConfig),
    {
        let mut config = SinkConfig::default();
        configure(&mut config);
        register(
            self,
            &config,
            Defaults::Current,
            DeliveryMode::Volatile,
            FormatterOverrides::default(),
        )
    }

    /// Durable delivery, configured through a callback.
    fn write_to_logdna_durable<F>(&mut self, configure: F) -> Result<Self::Output>
    where
        F: FnOnce(&mut SinkConfig),
    {
        let mut config = SinkConfig::default();
        configure(&mut config);
        register(
            self,
            &config,
            Defaults::Current,
            DeliveryMode::Durable,
            FormatterOverrides::default(),
        )
    }

    /// Volatile delivery with named arguments.
    fn http_logdna(&mut self, args: HttpLogdnaArgs) -> Result<Self::Output> {
        let (config, overrides) = args.split();
        register(self, &config, Defaults::Current, DeliveryMode::Volatile, overrides)
    }

    /// Durable delivery with named arguments.
    fn durable_http_logdna(&mut self, args: DurableHttpLogdnaArgs) -> Result<Self::Output> {
        let (config, overrides) = args.split();
        register(self, &config, Defaults::Current, DeliveryMode::Durable, overrides)
    }

    /// Volatile delivery with the original 50 event / 15 second defaults.
    #[deprecated(note = "use `http_logdna` or `write_to_logdna`")]
    fn logdna(&mut self, args: LogdnaArgs) -> Result<Self::Output> {
        register(
            self,
            &args.into(),
            Defaults::Legacy,
            DeliveryMode::Volatile,
            FormatterOverrides::default(),
        )
    }

    /// Durable delivery from a caller-owned configuration, buffer files
    /// named after its `buffer_mode`.
    #[deprecated(note = "use `durable_http_logdna` or `write_to_logdna_durable`")]
    fn sink_logdna(&mut self, config: &SinkConfig) -> Result<Self::Output> {
        register(
            self,
            config,
            Defaults::Legacy,
            DeliveryMode::DurableFromBufferMode,
            FormatterOverrides::default(),
        )
    }

    /// Durable delivery with named arguments, buffer files named after
    /// `buffer_mode`.
    #[deprecated(note = "use `durable_http_logdna` or `write_to_logdna_durable`")]
    fn sink_logdna_with(&mut self, args: SinkLogdnaArgs) -> Result<Self::Output> {
        register(
            self,
            &args.into(),
            Defaults::Legacy,
            DeliveryMode::DurableFromBufferMode,
            FormatterOverrides::default(),
        )
    }
}

impl<E: DeliveryEngine + ?Sized> LogdnaSinkExt for E {}
