//! Volatile delivery example.
//!
//! Registers a LogDNA sink with a toy engine that posts every event as soon
//! as it arrives, and forwards `tracing` events to it.
//!
//! Run with:
//! ```bash
//! LOGDNA_API_KEY=... cargo run --example volatile
//! ```

use std::sync::Arc;

use logdna_sink::{
    DeliveryEngine, DurableParams, EventSink, LogEvent, LogdnaSinkExt, SinkLayer, VolatileParams,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Posts each event in its own batch on the current tokio runtime.
struct PostEach {
    params: VolatileParams,
    runtime: tokio::runtime::Handle,
}

impl EventSink for PostEach {
    fn emit(&self, event: LogEvent) {
        let line = self.params.formatters.text.format(&event);
        let body = self.params.formatters.batch.format(&[line]);
        let client = Arc::clone(&self.params.http_client);
        let uri = self.params.request_uri.clone();
        self.runtime.spawn(async move {
            match client.post(&uri, body).await {
                Ok(response) => eprintln!("ingest responded {}", response.status()),
                Err(e) => eprintln!("ingest failed: {}", e),
            }
        });
    }
}

struct Engine(tokio::runtime::Handle);

impl DeliveryEngine for Engine {
    type Output = SinkLayer<PostEach>;

    fn http(&mut self, params: VolatileParams) -> Self::Output {
        let level = params.minimum_level;
        SinkLayer::new(
            PostEach {
                params,
                runtime: self.0.clone(),
            },
            level,
        )
    }

    fn durable_http(&mut self, _params: DurableParams) -> Self::Output {
        unimplemented!("this engine only delivers from memory")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("LOGDNA_API_KEY").unwrap_or_default();

    let layer = Engine(tokio::runtime::Handle::current()).write_to_logdna(|config| {
        config.api_key = api_key;
        config.app_name = Some("volatile-demo".to_string());
        config.tags = Some("demo,volatile".to_string());
    })?;

    tracing_subscriber::registry()
        .with(EnvFilter::new("info"))
        .with(tracing_subscriber::fmt::layer())
        .with(layer)
        .try_init()?;

    tracing::info!(user = "alice", action = "login", "User performed an action");
    tracing::warn!(error_code = 404, path = "/api/users", "Resource not found");

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    Ok(())
}
