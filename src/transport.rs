//! Shapes resolved settings into what the delivery engine needs for the
//! chosen delivery mode. Nothing here touches the network or the disk.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::Result;
use crate::buffer::Limit;
use crate::client::{HttpClient, LogdnaHttpClient};
use crate::config::LogLevel;
use crate::formatter::{BatchFormatter, LogdnaBatchFormatter, LogdnaTextFormatter, TextFormatter};
use crate::resolver::ResolvedConfig;

/// How batches reach the ingestion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Bounded in-memory queue; unsent events are lost on crash.
    Volatile,
    /// Disk-buffered, using the configured `buffer_path_format`.
    Durable,
    /// Disk-buffered, with the file pattern derived from `buffer_mode`.
    DurableFromBufferMode,
}

/// Text and batch formatter pair handed to the engine.
#[derive(Clone)]
pub struct Formatters {
    /// Renders one event.
    pub text: Arc<dyn TextFormatter>,
    /// Wraps rendered events into a request body.
    pub batch: Arc<dyn BatchFormatter>,
}

impl Formatters {
    /// The LogDNA formatters for a resolved configuration.
    pub fn logdna(resolved: &ResolvedConfig) -> Self {
        Self::with_overrides(resolved, FormatterOverrides::default())
    }

    /// Caller-supplied formatters where given, LogDNA ones otherwise.
    pub fn with_overrides(resolved: &ResolvedConfig, overrides: FormatterOverrides) -> Self {
        Self {
            text: overrides.text.unwrap_or_else(|| {
                Arc::new(LogdnaTextFormatter::new(
                    resolved.app_name.clone(),
                    resolved.environment_name.clone(),
                ))
            }),
            batch: overrides
                .batch
                .unwrap_or_else(|| Arc::new(LogdnaBatchFormatter)),
        }
    }
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatters").finish_non_exhaustive()
    }
}

/// Formatters a caller wants instead of the LogDNA defaults.
#[derive(Clone, Default)]
pub struct FormatterOverrides {
    /// Replacement event renderer.
    pub text: Option<Arc<dyn TextFormatter>>,
    /// Replacement batch wrapper.
    pub batch: Option<Arc<dyn BatchFormatter>>,
}

impl fmt::Debug for FormatterOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterOverrides")
            .field("text", &self.text.is_some())
            .field("batch", &self.batch.is_some())
            .finish()
    }
}

/// Parameters for in-memory delivery.
#[derive(Clone)]
pub struct VolatileParams {
    /// Ingestion URL with `hostname`/`tags` applied.
    pub request_uri: String,
    /// Maximum events per batch.
    pub batch_posting_limit: usize,
    /// Maximum events queued before the oldest are dropped.
    pub queue_limit: Limit,
    /// Maximum wait before a partial batch is flushed.
    pub period: Duration,
    /// Events below this severity are dropped.
    pub minimum_level: LogLevel,
    /// Event and batch rendering.
    pub formatters: Formatters,
    /// Authenticated transport.
    ///
    /// The connection pool is released when the last clone of this `Arc`
    /// is dropped.
    pub http_client: Arc<dyn HttpClient>,
}

/// Parameters for disk-buffered delivery.
#[derive(Clone)]
pub struct DurableParams {
    /// Ingestion URL with `hostname`/`tags` applied.
    pub request_uri: String,
    /// Buffer file name pattern containing a `{Date}`, `{HalfHour}` or `{Hour}` placeholder.
    pub buffer_path_format: String,
    /// Size cap of a single buffer file.
    pub buffer_file_size_limit_bytes: Limit,
    /// Number of historical buffer files kept.
    pub retained_buffer_file_count_limit: usize,
    /// Maximum events per batch.
    pub batch_posting_limit: usize,
    /// Maximum wait before a partial batch is flushed.
    pub period: Duration,
    /// Events below this severity are dropped.
    pub minimum_level: LogLevel,
    /// Event and batch rendering.
    pub formatters: Formatters,
    /// Authenticated transport.
    ///
    /// The connection pool is released when the last clone of this `Arc`
    /// is dropped.
    pub http_client: Arc<dyn HttpClient>,
}

/// Engine parameters for the selected delivery mode.
#[derive(Debug, Clone)]
pub enum TransportPlan {
    /// In-memory delivery.
    Volatile(VolatileParams),
    /// Disk-buffered delivery.
    Durable(DurableParams),
}

impl TransportPlan {
    /// Ingestion URL the plan posts to.
    pub fn request_uri(&self) -> &str {
        match self {
            Self::Volatile(params) => &params.request_uri,
            Self::Durable(params) => &params.request_uri,
        }
    }

    /// The volatile parameters, if this is a volatile plan.
    pub fn as_volatile(&self) -> Option<&VolatileParams> {
        match self {
            Self::Volatile(params) => Some(params),
            Self::Durable(_) => None,
        }
    }

    /// The durable parameters, if this is a durable plan.
    pub fn as_durable(&self) -> Option<&DurableParams> {
        match self {
            Self::Durable(params) => Some(params),
            Self::Volatile(_) => None,
        }
    }
}

/// Build engine parameters for `mode`.
///
/// Formatters not overridden by the caller default to the LogDNA ones. The
/// HTTP client is created here from the resolved API key.
pub fn select(
    resolved: &ResolvedConfig,
    mode: DeliveryMode,
    overrides: FormatterOverrides,
) -> Result<TransportPlan> {
    let formatters = Formatters::with_overrides(resolved, overrides);
    let http_client: Arc<dyn HttpClient> = Arc::new(LogdnaHttpClient::new(resolved.api_key())?);

    let plan = match mode {
        DeliveryMode::Volatile => TransportPlan::Volatile(VolatileParams {
            request_uri: resolved.endpoint.clone(),
            batch_posting_limit: resolved.batch_posting_limit,
            queue_limit: resolved.queue_limit,
            period: resolved.period,
            minimum_level: resolved.minimum_level,
            formatters,
            http_client,
        }),
        DeliveryMode::Durable | DeliveryMode::DurableFromBufferMode => {
            let buffer_path_format = if mode == DeliveryMode::DurableFromBufferMode {
                resolved.buffer_mode.path_format()
            } else {
                resolved.buffer_path_format.clone()
            };
            TransportPlan::Durable(DurableParams {
                request_uri: resolved.endpoint.clone(),
                buffer_path_format,
                buffer_file_size_limit_bytes: resolved.buffer_file_size_limit_bytes,
                retained_buffer_file_count_limit: resolved.retained_buffer_file_count_limit,
                batch_posting_limit: resolved.batch_posting_limit,
                period: resolved.period,
                minimum_level: resolved.minimum_level,
                formatters,
                http_client,
            })
        }
    };

    debug!(?mode, request_uri = %plan.request_uri(), "selected LogDNA transport");
    Ok(plan)
}

impl fmt::Debug for VolatileParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolatileParams")
            .field("request_uri", &self.request_uri)
            .field("batch_posting_limit", &self.batch_posting_limit)
            .field("queue_limit", &self.queue_limit)
            .field("period", &self.period)
            .field("minimum_level", &self.minimum_level)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for DurableParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableParams")
            .field("request_uri", &self.request_uri)
            .field("buffer_path_format", &self.buffer_path_format)
            .field("buffer_file_size_limit_bytes", &self.buffer_file_size_limit_bytes)
            .field(
                "retained_buffer_file_count_limit",
                &self.retained_buffer_file_count_limit,
            )
            .field("batch_posting_limit", &self.batch_posting_limit)
            .field("period", &self.period)
            .field("minimum_level", &self.minimum_level)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferMode;
    use crate::config::SinkConfig;
    use crate::formatter::LogEvent;
    use crate::resolver::{Defaults, resolve_with};

    fn resolved(config: SinkConfig, defaults: Defaults) -> ResolvedConfig {
        resolve_with(&config, defaults, "web-01", Some("production".to_string())).unwrap()
    }

    fn base() -> SinkConfig {
        SinkConfig::new("abc123").with_ingest_url("http://localhost:8080/ingest")
    }

    #[test]
    fn test_volatile_plan() {
        let resolved = resolved(base().with_queue_limit(10), Defaults::Current);
        let plan =
            select(&resolved, DeliveryMode::Volatile, FormatterOverrides::default()).unwrap();
        let params = plan.as_volatile().unwrap();

        assert_eq!(
            params.request_uri,
            "http://localhost:8080/ingest?hostname=web-01"
        );
        assert_eq!(params.batch_posting_limit, 1000);
        assert_eq!(params.queue_limit, Limit::Bounded(10));
        assert_eq!(params.period, Duration::from_secs(2));
        assert_eq!(params.minimum_level, LogLevel::Verbose);
        assert!(plan.as_durable().is_none());
    }

    #[test]
    fn test_durable_plan_uses_configured_path() {
        let config = base()
            .with_buffer_path_format("/var/spool/app/Buffer-{Date}.json")
            .with_buffer_file_size_limit(1024 * 1024)
            .with_retained_buffer_file_count_limit(5);
        let resolved = resolved(config, Defaults::Current);
        let plan = select(&resolved, DeliveryMode::Durable, FormatterOverrides::default()).unwrap();
        let params = plan.as_durable().unwrap();

        assert_eq!(params.buffer_path_format, "/var/spool/app/Buffer-{Date}.json");
        assert_eq!(params.buffer_file_size_limit_bytes, Limit::Bounded(1024 * 1024));
        assert_eq!(params.retained_buffer_file_count_limit, 5);
        assert_eq!(params.batch_posting_limit, 1000);
    }

    #[test]
    fn test_durable_plan_from_buffer_mode() {
        for (mode, expected) in [
            (BufferMode::Date, "Buffer-{Date}.json"),
            (BufferMode::HalfHour, "Buffer-{HalfHour}.json"),
            (BufferMode::Hour, "Buffer-{Hour}.json"),
        ] {
            let resolved = resolved(base().with_buffer_mode(mode), Defaults::Legacy);
            let plan = select(
                &resolved,
                DeliveryMode::DurableFromBufferMode,
                FormatterOverrides::default(),
            )
            .unwrap();
            let params = plan.as_durable().unwrap();
            assert_eq!(params.buffer_path_format, expected);
            assert_eq!(params.period, Duration::from_secs(15));
            assert_eq!(params.batch_posting_limit, 50);
        }
    }

    #[test]
    fn test_default_formatters_carry_app_and_env() {
        let resolved = resolved(base().with_app_name("api"), Defaults::Current);
        let plan =
            select(&resolved, DeliveryMode::Volatile, FormatterOverrides::default()).unwrap();
        let params = plan.as_volatile().unwrap();

        let line = params
            .formatters
            .text
            .format(&LogEvent::new(LogLevel::Information, "hello"));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["app"], "api");
        assert_eq!(value["env"], "production");
    }

    #[test]
    fn test_custom_formatters_are_kept() {
        struct Plain;
        impl TextFormatter for Plain {
            fn format(&self, event: &LogEvent) -> String {
                event.message.clone()
            }
        }

        let resolved = resolved(base(), Defaults::Current);
        let overrides = FormatterOverrides {
            text: Some(Arc::new(Plain)),
            batch: None,
        };
        let plan = select(&resolved, DeliveryMode::Volatile, overrides).unwrap();
        let params = plan.as_volatile().unwrap();
        let line = params
            .formatters
            .text
            .format(&LogEvent::new(LogLevel::Information, "hello"));
        assert_eq!(line, "hello");

        let body = params.formatters.batch.format(&[line]);
        assert_eq!(&body[..], br#"{"lines":[hello]}"#);
    }

    #[test]
    fn test_plan_debug_has_no_secret() {
        let resolved = resolved(base(), Defaults::Current);
        let plan =
            select(&resolved, DeliveryMode::Volatile, FormatterOverrides::default()).unwrap();
        let rendered = format!("{:?}", plan);
        assert!(!rendered.contains("abc123"));
        assert!(!rendered.contains("YWJjMTIzOg=="));
    }
}
