//! The poll loop
//!
//! A [`Pipeline`] is built once from configuration and three injected
//! handles: a [`FeedSource`], a [`DocumentIndexer`] and a
//! [`TransactionSink`]. Each iteration runs fetch, transform and index
//! strictly in sequence, records the result as a transaction and then sleeps
//! for the configured interval.
//!
//! # Outcomes
//!
//! | Situation                                   | Outcome   |
//! |---------------------------------------------|-----------|
//! | Feed unreachable, bad status or undecodable | `failure` |
//! | Malformed entity under the `abort` policy   | `failure` |
//! | Documents indexed, even with rejections     | `success` |
//! | Bulk transport failure                      | `success` |
//!
//! Only the iteration's own transaction sees a failure; the loop always
//! continues.

pub mod trace;

pub use trace::{LogTransactionSink, Outcome, Transaction, TransactionSink};

use crate::adapters::elasticsearch::DocumentIndexer;
use crate::adapters::feed::FeedSource;
use crate::config::{MalformedRecordPolicy, RailposConfig};
use crate::core::transform::transform;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Span names, shared by tracing and the transaction sink
pub const QUERY_FEED_SPAN: &str = "query_feed";
pub const FORMAT_DATA_SPAN: &str = "format_data";
pub const SEND_TO_ELASTICSEARCH_SPAN: &str = "send_to_elasticsearch";

/// Immutable settings of a pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Transaction name
    pub service_name: String,

    /// Target index
    pub index_name: String,

    /// Pause between iterations
    pub sleep_duration: Duration,

    pub malformed_records: MalformedRecordPolicy,
}

impl From<&RailposConfig> for PipelineSettings {
    fn from(config: &RailposConfig) -> Self {
        Self {
            service_name: config.service.name.clone(),
            index_name: config.elasticsearch.index_name.clone(),
            sleep_duration: config.pipeline.sleep_duration(),
            malformed_records: config.pipeline.malformed_records,
        }
    }
}

/// The fetch → transform → index loop
pub struct Pipeline {
    settings: PipelineSettings,
    feed: Arc<dyn FeedSource>,
    indexer: Arc<dyn DocumentIndexer>,
    sink: Arc<dyn TransactionSink>,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        feed: Arc<dyn FeedSource>,
        indexer: Arc<dyn DocumentIndexer>,
        sink: Arc<dyn TransactionSink>,
    ) -> Self {
        Self {
            settings,
            feed,
            indexer,
            sink,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs iterations forever
    pub async fn run(&self) {
        tracing::info!(
            service = %self.settings.service_name,
            index = %self.settings.index_name,
            sleep_seconds = self.settings.sleep_duration.as_secs(),
            "Starting poll loop"
        );

        loop {
            self.run_iteration().await;
            tokio::time::sleep(self.settings.sleep_duration).await;
        }
    }

    /// Runs `iterations` iterations, sleeping between them but not after the
    /// last one, and returns their outcomes
    pub async fn run_for(&self, iterations: u64) -> Vec<Outcome> {
        let mut outcomes = Vec::new();

        for iteration in 0..iterations {
            if iteration > 0 {
                tokio::time::sleep(self.settings.sleep_duration).await;
            }
            outcomes.push(self.run_iteration().await);
        }

        outcomes
    }

    /// Runs one fetch → transform → index pass and reports its transaction
    pub async fn run_iteration(&self) -> Outcome {
        let mut transaction = Transaction::begin(&self.settings.service_name);

        let outcome = self.execute(&mut transaction).await;
        transaction.end(outcome);

        if outcome == Outcome::Success {
            tracing::info!(
                outcome = %outcome,
                duration_ms = transaction.duration.as_millis() as u64,
                "Iteration finished"
            );
        } else {
            tracing::warn!(
                outcome = %outcome,
                duration_ms = transaction.duration.as_millis() as u64,
                errors = transaction.errors.len(),
                "Iteration failed"
            );
        }

        self.sink.report(&transaction).await;
        outcome
    }

    async fn execute(&self, transaction: &mut Transaction) -> Outcome {
        // Fetch
        let span = transaction.start_span(QUERY_FEED_SPAN, "external.http");
        let fetched = self
            .feed
            .fetch()
            .instrument(tracing::info_span!(QUERY_FEED_SPAN))
            .await;

        let message = match fetched {
            Ok(message) => {
                transaction.finish_span(
                    span,
                    Outcome::Success,
                    labels(json!({"entities": message.entity.len()})),
                );
                message
            }
            Err(e) => {
                tracing::warn!(error = %e, "Feed unavailable");
                transaction.finish_span(span, Outcome::Failure, Map::new());
                transaction.capture_error(QUERY_FEED_SPAN, &e);
                return Outcome::Failure;
            }
        };

        // Transform
        let span = transaction.start_span(FORMAT_DATA_SPAN, "app");
        let transformed = tracing::info_span!(FORMAT_DATA_SPAN, entities = message.entity.len())
            .in_scope(|| transform(&message, self.settings.malformed_records));

        let output = match transformed {
            Ok(output) => {
                transaction.finish_span(
                    span,
                    Outcome::Success,
                    labels(json!({
                        "documents": output.documents.len(),
                        "skipped": output.skipped.len(),
                    })),
                );
                output
            }
            Err(e) => {
                tracing::error!(error = %e, "Transform aborted");
                transaction.finish_span(span, Outcome::Failure, Map::new());
                transaction.capture_error(FORMAT_DATA_SPAN, &e);
                return Outcome::Failure;
            }
        };

        // Index
        let span = transaction.start_span(SEND_TO_ELASTICSEARCH_SPAN, "db.elasticsearch");
        let report = self
            .indexer
            .index(&output.documents, &self.settings.index_name)
            .instrument(tracing::info_span!(
                SEND_TO_ELASTICSEARCH_SPAN,
                index = %self.settings.index_name,
                documents = output.documents.len()
            ))
            .await;

        let index_outcome = if report.is_complete() {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        transaction.finish_span(
            span,
            index_outcome,
            labels(json!({
                "created": report.created,
                "duplicates": report.duplicates,
                "failed": report.failed,
            })),
        );
        if let Some(ref error) = report.transport_error {
            transaction.capture_error(SEND_TO_ELASTICSEARCH_SPAN, error);
        }

        Outcome::Success
    }
}

fn labels(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
