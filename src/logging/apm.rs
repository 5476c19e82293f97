//! Elastic APM integration
//!
//! Ships each iteration's [`Transaction`] to an APM server using the intake
//! v2 protocol: one NDJSON request holding a metadata line, the transaction,
//! its spans and any captured errors.
//!
//! # Example
//!
//! ```no_run
//! use railpos::config::load_config;
//! use railpos::core::pipeline::{Outcome, Transaction, TransactionSink};
//! use railpos::logging::apm::ApmReporter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("railpos.toml")?;
//! let reporter = ApmReporter::new(&config.apm, &config.service)?;
//!
//! let mut transaction = Transaction::begin(&config.service.name);
//! transaction.end(Outcome::Success);
//! reporter.report(&transaction).await;
//! # Ok(())
//! # }
//! ```

use crate::config::{ApmConfig, SecretString, ServiceConfig};
use crate::core::pipeline::{Transaction, TransactionSink};
use crate::domain::{RailposError, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, warn};

/// Intake endpoint path on the APM server
pub const INTAKE_PATH: &str = "/intake/v2/events";

/// Reports transactions to an Elastic APM server
pub struct ApmReporter {
    intake_url: String,
    secret_token: SecretString,
    metadata: Value,
    http_client: reqwest::Client,
}

impl ApmReporter {
    /// Create a reporter from the APM and service sections
    ///
    /// # Errors
    ///
    /// Returns an error if the server URL or token is missing, or the HTTP
    /// client cannot be built.
    pub fn new(config: &ApmConfig, service: &ServiceConfig) -> Result<Self> {
        let server_url = config.server_url.as_ref().ok_or_else(|| {
            RailposError::Configuration("apm.server_url is required".to_string())
        })?;
        let secret_token = config.secret_token.clone().ok_or_else(|| {
            RailposError::Configuration("apm.secret_token is required".to_string())
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| RailposError::Apm(format!("Failed to create HTTP client: {e}")))?;

        let metadata = json!({
            "metadata": {
                "service": {
                    "name": service.name,
                    "version": service.version,
                    "environment": service.environment,
                    "agent": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                    "language": {"name": "rust"},
                }
            }
        });

        debug!(server_url = %server_url, "APM reporter initialized");

        Ok(Self {
            intake_url: format!("{}{}", server_url.trim_end_matches('/'), INTAKE_PATH),
            secret_token,
            metadata,
            http_client,
        })
    }

    /// Full intake URL
    pub fn intake_url(&self) -> &str {
        &self.intake_url
    }

    /// Builds the NDJSON intake payload for one transaction
    pub fn encode(&self, transaction: &Transaction) -> String {
        let mut body = String::new();
        // Writing to a String cannot fail
        let _ = writeln!(body, "{}", self.metadata);

        let result = transaction.result.map(|o| o.as_str()).unwrap_or("unknown");
        let event = json!({
            "transaction": {
                "id": transaction.id,
                "trace_id": transaction.trace_id,
                "name": transaction.name,
                "type": transaction.transaction_type,
                "timestamp": transaction.started_at.timestamp_micros(),
                "duration": millis(transaction.duration),
                "result": result,
                "outcome": result,
                "sampled": true,
                "span_count": {"started": transaction.spans.len(), "dropped": 0},
            }
        });
        let _ = writeln!(body, "{event}");

        for span in &transaction.spans {
            let event = json!({
                "span": {
                    "id": span.id,
                    "transaction_id": transaction.id,
                    "trace_id": transaction.trace_id,
                    "parent_id": transaction.id,
                    "name": span.name,
                    "type": span.span_type,
                    "timestamp": span.started_at.timestamp_micros(),
                    "duration": millis(span.duration),
                    "outcome": span.outcome.as_str(),
                    "context": {"tags": span.labels},
                }
            });
            let _ = writeln!(body, "{event}");
        }

        for captured in &transaction.errors {
            let event = json!({
                "error": {
                    "id": captured.id,
                    "trace_id": transaction.trace_id,
                    "transaction_id": transaction.id,
                    "parent_id": transaction.id,
                    "timestamp": captured.occurred_at.timestamp_micros(),
                    "culprit": captured.culprit,
                    "exception": {"message": captured.message, "handled": true},
                    "transaction": {"type": transaction.transaction_type, "sampled": true},
                }
            });
            let _ = writeln!(body, "{event}");
        }

        body
    }

    /// Sends one transaction to the intake endpoint
    ///
    /// # Errors
    ///
    /// Returns [`RailposError::Apm`] if the request fails or is rejected.
    pub async fn send(&self, transaction: &Transaction) -> Result<()> {
        let response = self
            .http_client
            .post(&self.intake_url)
            .header(
                "Authorization",
                format!("Bearer {}", self.secret_token.expose_secret()),
            )
            .header("Content-Type", "application/x-ndjson")
            .body(self.encode(transaction))
            .send()
            .await
            .map_err(|e| RailposError::Apm(format!("Failed to send transaction: {e}")))?;

        let status = response.status();
        if status.is_success() {
            debug!(
                status = %status,
                transaction_id = %transaction.id,
                "Transaction accepted by APM server"
            );
            Ok(())
        } else {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(RailposError::Apm(format!(
                "APM intake returned status {status}: {error_body}"
            )))
        }
    }
}

#[async_trait]
impl TransactionSink for ApmReporter {
    async fn report(&self, transaction: &Transaction) {
        if let Err(e) = self.send(transaction).await {
            warn!(
                error = %e,
                transaction_id = %transaction.id,
                "Failed to report transaction to APM"
            );
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
