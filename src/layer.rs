//! `tracing` integration.
//!
//! [`SinkLayer`] turns `tracing` events into [`LogEvent`]s and hands them to
//! whatever the delivery engine returned from registration.
//!
//! ```rust,no_run
//! use logdna_sink::{EventSink, LogEvent, LogLevel, SinkLayer};
//! use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
//!
//! struct Stdout;
//!
//! impl EventSink for Stdout {
//!     fn emit(&self, event: LogEvent) {
//!         println!("{} {}", event.level, event.message);
//!     }
//! }
//!
//! tracing_subscriber::registry()
//!     .with(SinkLayer::new(Stdout, LogLevel::Information))
//!     .init();
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::config::LogLevel;
use crate::formatter::LogEvent;

/// Receives events accepted by a [`SinkLayer`].
pub trait EventSink: Send + Sync + 'static {
    /// Take ownership of one event. Must not block.
    fn emit(&self, event: LogEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: LogEvent) {
        (**self).emit(event)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&self, event: LogEvent) {
        (**self).emit(event)
    }
}

/// A layer forwarding events at or above a minimum level to an [`EventSink`].
pub struct SinkLayer<S> {
    sink: S,
    minimum_level: LogLevel,
}

impl<S: EventSink> SinkLayer<S> {
    /// Create a layer forwarding events at `minimum_level` and above.
    pub fn new(sink: S, minimum_level: LogLevel) -> Self {
        Self {
            sink,
            minimum_level,
        }
    }

    /// The wrapped sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S> fmt::Debug for SinkLayer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkLayer")
            .field("minimum_level", &self.minimum_level)
            .finish_non_exhaustive()
    }
}

impl<S, C> Layer<C> for SinkLayer<S>
where
    S: EventSink,
    C: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, C>) {
        let metadata = event.metadata();
        let level = LogLevel::from(*metadata.level());
        if level < self.minimum_level {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut log_event = LogEvent::new(level, visitor.message.unwrap_or_default());
        log_event.properties = visitor.fields;
        log_event
            .properties
            .insert("target".to_string(), Value::from(metadata.target()));

        self.sink.emit(log_event);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{:?}", value)));
    }
}
