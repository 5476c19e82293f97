//! Annotate command implementation
//!
//! Marks a deployment on the service's APM timeline through Kibana.

use crate::adapters::kibana::{Annotation, KibanaClient};
use crate::cli::{EXIT_CONFIG, EXIT_CONNECTION, EXIT_OK};
use crate::config::load_config_with_secrets;
use chrono::Utc;
use clap::Args;

/// Arguments for the annotate command
#[derive(Args, Debug, Default)]
pub struct AnnotateArgs {
    /// Short message to be displayed for the annotation
    #[arg(short, long)]
    pub message: Option<String>,

    /// Service version to annotate (defaults to service.version)
    #[arg(short, long)]
    pub version: Option<String>,
}

impl AnnotateArgs {
    /// Execute the annotate command
    pub async fn execute(&self, config_path: &str, secrets_path: Option<&str>) -> anyhow::Result<i32> {
        let config = match load_config_with_secrets(config_path, secrets_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let Some(kibana_url) = config.kibana.url.as_deref() else {
            eprintln!("Configuration error: kibana.url is required to create annotations");
            return Ok(EXIT_CONFIG);
        };

        let version = self
            .version
            .as_deref()
            .unwrap_or(&config.service.version);
        let annotation = Annotation::new(
            version,
            &config.service.environment,
            self.message.as_deref(),
            Utc::now(),
        );

        let client = KibanaClient::new(kibana_url, &config.elasticsearch)?;
        match client.annotate(&config.service.name, &annotation).await {
            Ok(response) => {
                println!("{response}");
                Ok(EXIT_OK)
            }
            Err(e) => {
                tracing::error!(error = %e, "Annotation failed");
                eprintln!("Failed to create annotation: {e}");
                Ok(EXIT_CONNECTION)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::io::Write;

    fn write_config(kibana_url: Option<&str>) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let kibana = kibana_url
            .map(|url| format!("[kibana]\nurl = \"{url}\"\n"))
            .unwrap_or_default();
        write!(
            file,
            r#"
[service]
name = "wmata-rail-position"
version = "1.2.0"
environment = "production"

[feed]
url = "https://api.wmata.com/gtfs/rail-gtfsrt-vehiclepositions.pb"
api_key = "key"

[elasticsearch]
url = "https://es.example.com:9200"
username = "elastic"
password = "changeme"
index_name = "wmata-rail-position"

[apm]
enabled = false

[pipeline]
sleep_duration_seconds = 10

{kibana}"#
        )
        .unwrap();
        file
    }

    #[tokio::test]
    async fn test_annotate_uses_configured_version() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/apm/services/wmata-rail-position/annotation")
            .match_body(Matcher::PartialJson(json!({
                "service": {"version": "1.2.0", "environment": "production"},
                "message": "1.2.0 - rollout"
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let config = write_config(Some(&server.url()));
        let args = AnnotateArgs {
            message: Some("rollout".to_string()),
            version: None,
        };
        let code = args
            .execute(config.path().to_str().unwrap(), None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(code, EXIT_OK);
    }

    #[tokio::test]
    async fn test_version_flag_overrides_config() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/apm/services/wmata-rail-position/annotation")
            .match_body(Matcher::PartialJson(json!({
                "service": {"version": "2.0.0"},
                "message": "2.0.0"
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let config = write_config(Some(&server.url()));
        let args = AnnotateArgs {
            message: None,
            version: Some("2.0.0".to_string()),
        };
        let code = args
            .execute(config.path().to_str().unwrap(), None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(code, EXIT_OK);
    }

    #[tokio::test]
    async fn test_missing_kibana_url_is_config_error() {
        let config = write_config(None);
        let code = AnnotateArgs::default()
            .execute(config.path().to_str().unwrap(), None)
            .await
            .unwrap();

        assert_eq!(code, EXIT_CONFIG);
    }
}
