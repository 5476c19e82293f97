//! Kibana APM annotations
//!
//! Deployment markers are created through Kibana's APM annotation API and
//! authenticated with the Elasticsearch credentials.

use crate::config::{ElasticsearchConfig, SecretString};
use crate::core::transform::timestamp::TIMESTAMP_FORMAT;
use crate::domain::{RailposError, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Body of an annotation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub service: AnnotatedService,
    pub message: String,
}

/// Service fields of an annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedService {
    pub version: String,
    pub environment: String,
}

impl Annotation {
    /// Builds an annotation for `version`
    ///
    /// The message is `"{version} - {message}"`, or just the version when no
    /// message is given.
    ///
    /// ```
    /// use railpos::adapters::kibana::Annotation;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let at = Utc.with_ymd_and_hms(2024, 9, 16, 15, 20, 0).unwrap();
    /// let annotation = Annotation::new("1.2.0", "production", Some("hotfix"), at);
    /// assert_eq!(annotation.message, "1.2.0 - hotfix");
    /// assert_eq!(annotation.timestamp, "2024-09-16T15:20:00Z");
    /// ```
    pub fn new(
        version: &str,
        environment: &str,
        message: Option<&str>,
        at: DateTime<Utc>,
    ) -> Self {
        let message = match message {
            Some(text) => format!("{version} - {text}"),
            None => version.to_string(),
        };

        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            service: AnnotatedService {
                version: version.to_string(),
                environment: environment.to_string(),
            },
            message,
        }
    }
}

/// Client for the Kibana APM annotation endpoint
pub struct KibanaClient {
    client: Client,
    base_url: String,
    username: String,
    password: SecretString,
}

impl KibanaClient {
    /// Creates a client for `kibana_url` using the Elasticsearch credentials
    pub fn new(kibana_url: &str, credentials: &ElasticsearchConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RailposError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: kibana_url.trim_end_matches('/').to_string(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })
    }

    /// Annotation endpoint for a service
    pub fn annotation_url(&self, service_name: &str) -> String {
        format!("{}/api/apm/services/{}/annotation", self.base_url, service_name)
    }

    /// Creates an annotation and returns Kibana's JSON response
    ///
    /// # Errors
    ///
    /// Returns [`RailposError::Apm`] if the request fails or Kibana answers
    /// with a non-success status.
    pub async fn annotate(&self, service_name: &str, annotation: &Annotation) -> Result<Value> {
        let url = self.annotation_url(service_name);

        tracing::debug!(url = %url, message = %annotation.message, "Creating APM annotation");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(self.password.expose_secret().to_string()))
            .header("kbn-xsrf", "true")
            .json(annotation)
            .send()
            .await
            .map_err(|e| RailposError::Apm(format!("Failed to reach Kibana: {e}")))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(RailposError::Apm(format!(
                "Kibana annotation API returned status {status}: {body}"
            )));
        }

        tracing::info!(
            service = %service_name,
            version = %annotation.service.version,
            "APM annotation created"
        );

        Ok(body)
    }
}
