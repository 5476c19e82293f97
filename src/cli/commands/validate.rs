//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the railpos configuration and secrets files.

use crate::cli::{EXIT_CONFIG, EXIT_OK};
use crate::config::{load_config_with_secrets, RailposConfig};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str, secrets_path: Option<&str>) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        if let Some(secrets) = secrets_path {
            println!("   Secrets file: {secrets}");
        }
        println!();

        match load_config_with_secrets(config_path, secrets_path) {
            Ok(config) => {
                println!("✅ Configuration is valid");
                println!();
                print!("{}", summary(&config));
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(EXIT_CONFIG)
            }
        }
    }
}

/// Human-readable summary; secrets are never included
fn summary(config: &RailposConfig) -> String {
    let apm = match (config.apm.enabled, config.apm.server_url.as_deref()) {
        (true, Some(url)) => url.to_string(),
        _ => "disabled".to_string(),
    };

    let mut lines = vec![
        "Configuration Summary:".to_string(),
        format!("  Service: {}", config.service.name),
        format!("  Version: {}", config.service.version),
        format!("  Environment: {}", config.service.environment),
        format!("  Log Level: {}", config.application.log_level),
        format!("  Feed URL: {}", config.feed.url),
        format!("  Elasticsearch: {}", config.elasticsearch.url),
        format!("  Index: {}", config.elasticsearch.index_name),
        format!("  Bulk Chunk Size: {}", config.elasticsearch.bulk_chunk_size),
        format!("  APM Server: {apm}"),
        format!(
            "  Kibana: {}",
            config.kibana.url.as_deref().unwrap_or("not configured")
        ),
        format!(
            "  Sleep Duration: {}s",
            config.pipeline.sleep_duration_seconds
        ),
        format!("  Malformed Records: {}", config.pipeline.malformed_records),
    ];
    lines.push(String::new());
    lines.join("\n")
}
