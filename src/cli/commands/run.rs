//! Run command implementation
//!
//! This module implements the `run` command: validate configuration, check
//! that Elasticsearch is reachable, then poll until stopped.

use crate::adapters::elasticsearch::{BulkIndexer, ElasticsearchClient};
use crate::adapters::feed::HttpFeedClient;
use crate::cli::{EXIT_CONFIG, EXIT_CONNECTION, EXIT_FATAL, EXIT_OK};
use crate::config::{load_config_with_secrets, RailposConfig};
use crate::core::pipeline::{LogTransactionSink, Pipeline, PipelineSettings, TransactionSink};
use crate::domain::Result;
use crate::log_error_with_context;
use crate::logging::ApmReporter;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Run a single iteration and exit
    #[arg(long)]
    pub once: bool,

    /// Stop after N iterations
    #[arg(long, value_name = "N", conflicts_with = "once")]
    pub max_iterations: Option<u64>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        secrets_path: Option<&str>,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting run command");

        let config = match load_config_with_secrets(config_path, secrets_path) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let client = match ElasticsearchClient::new(&config.elasticsearch) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to initialize Elasticsearch client: {e}");
                return Ok(EXIT_FATAL);
            }
        };
        if let Err(e) = client.ping().await {
            log_error_with_context!(&e, "Elasticsearch is not reachable");
            eprintln!("Could not connect to Elasticsearch at {}: {e}", config.elasticsearch.url);
            return Ok(EXIT_CONNECTION);
        }

        let pipeline = build_pipeline(&config, client)?;

        let iterations = if self.once {
            Some(1)
        } else {
            self.max_iterations
        };

        tokio::select! {
            _ = async {
                match iterations {
                    Some(n) => {
                        let outcomes = pipeline.run_for(n).await;
                        tracing::info!(iterations = outcomes.len(), "Bounded run finished");
                    }
                    None => pipeline.run().await,
                }
            } => {}
            _ = wait_for_shutdown(&mut shutdown_signal) => {
                tracing::info!("Shutdown requested, stopping poll loop");
            }
        }

        Ok(EXIT_OK)
    }
}

/// Resolves once shutdown is requested; never resolves if the sender is gone
async fn wait_for_shutdown(signal: &mut watch::Receiver<bool>) {
    while !*signal.borrow() {
        if signal.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Wires the production adapters into a pipeline
pub fn build_pipeline(config: &RailposConfig, client: ElasticsearchClient) -> Result<Pipeline> {
    let feed = HttpFeedClient::new(&config.feed)?;
    let indexer = BulkIndexer::new(client, config.elasticsearch.bulk_chunk_size);

    let sink: Arc<dyn TransactionSink> = if config.apm.enabled {
        Arc::new(ApmReporter::new(&config.apm, &config.service)?)
    } else {
        tracing::info!("APM disabled, transactions will only be logged");
        Arc::new(LogTransactionSink)
    };

    Ok(Pipeline::new(
        PipelineSettings::from(config),
        Arc::new(feed),
        Arc::new(indexer),
        sink,
    ))
}
