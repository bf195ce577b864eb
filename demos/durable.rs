//! Durable delivery example.
//!
//! Shows the parameters a disk-buffering engine receives from the legacy
//! record-based entry point and from the current named-argument one.

#![allow(deprecated)]

use logdna_sink::{
    BufferMode, DeliveryEngine, DurableHttpLogdnaArgs, DurableParams, LogdnaSinkExt, SinkConfig,
    VolatileParams,
};

struct PrintEngine;

impl DeliveryEngine for PrintEngine {
    type Output = ();

    fn http(&mut self, params: VolatileParams) {
        println!("volatile: {:#?}", params);
    }

    fn durable_http(&mut self, params: DurableParams) {
        println!("durable: {:#?}", params);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SinkConfig::new("my-ingestion-key")
        .with_app_name("durable-demo")
        .with_buffer_mode(BufferMode::HalfHour)
        .with_buffer_file_size_limit(10 * 1024 * 1024);
    PrintEngine.sink_logdna(&config)?;

    PrintEngine.durable_http_logdna(DurableHttpLogdnaArgs {
        api_key: "my-ingestion-key".to_string(),
        buffer_path_format: "spool/Buffer-{Date}.json".to_string(),
        retained_buffer_file_count_limit: 7,
        ..Default::default()
    })?;

    Ok(())
}
