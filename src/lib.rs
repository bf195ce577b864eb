//! # logdna-sink
//!
//! Ship structured log events to a LogDNA ingestion endpoint over
//! authenticated HTTP.
//!
//! ## Features
//!
//! - One resolver behind several configuration styles (callback, named
//!   arguments, pre-built record)
//! - Ingestion URL composition with `hostname` and `tags` parameters
//! - Volatile (in-memory) and durable (disk-buffered) delivery plans
//! - Basic-authenticated async HTTP client built on `reqwest`
//! - Integration with the `tracing` ecosystem
//!
//! The batching engine that schedules flushes, retries and manages buffer
//! files is supplied by the caller through [`DeliveryEngine`].
//!
//! ## Example
//!
//! ```rust
//! use logdna_sink::{Defaults, DeliveryMode, FormatterOverrides, SinkConfig};
//!
//! let config = SinkConfig::new("my-ingestion-key")
//!     .with_app_name("checkout")
//!     .with_tags("web,eu");
//! let resolved = logdna_sink::resolve(&config, Defaults::Current)?;
//! let overrides = FormatterOverrides::default();
//! let plan = logdna_sink::select(&resolved, DeliveryMode::Volatile, overrides)?;
//!
//! assert!(plan.request_uri().ends_with("tags=web%2Ceu"));
//! # Ok::<(), logdna_sink::Error>(())
//! ```

pub mod buffer;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod formatter;
pub mod layer;
pub mod resolver;
pub mod sink;
pub mod transport;

pub use buffer::{BufferMode, Limit};
pub use client::{HttpClient, LogdnaHttpClient};
pub use config::{LogLevel, SinkConfig};
pub use error::{Error, Result};
pub use formatter::{
    BatchFormatter, LogEvent, LogdnaBatchFormatter, LogdnaTextFormatter, TextFormatter,
};
pub use layer::{EventSink, SinkLayer};
pub use resolver::{Defaults, ResolvedConfig, resolve};
pub use sink::{
    DeliveryEngine, DurableHttpLogdnaArgs, HttpLogdnaArgs, LogdnaArgs, LogdnaSinkExt,
    SinkLogdnaArgs,
};
pub use transport::{
    DeliveryMode, DurableParams, FormatterOverrides, Formatters, TransportPlan, VolatileParams,
    select,
};
