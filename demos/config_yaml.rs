//! Example of loading sink configuration from a YAML file.
//!
//! Run with:
//! ```bash
//! cargo run --example config_yaml
//! ```

use std::collections::HashMap;
use std::fs;

use logdna_sink::{Defaults, DeliveryMode, FormatterOverrides, SinkConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = "demos/config.yaml";
    let config_content = fs::read_to_string(config_path)?;

    let root: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&config_content)?;
    let mut config: SinkConfig = serde_yaml::from_value(root["logdna"].clone())?;
    if let Ok(key) = std::env::var("LOGDNA_API_KEY") {
        config.api_key = key;
    }

    let resolved = logdna_sink::resolve(&config, Defaults::Current)?;
    let overrides = FormatterOverrides::default();
    let plan = logdna_sink::select(&resolved, DeliveryMode::Durable, overrides)?;
    println!("{:#?}", plan);

    Ok(())
}
