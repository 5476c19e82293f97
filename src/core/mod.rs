//! Core business logic for railpos.
//!
//! # Modules
//!
//! - [`transform`] - Entity to document transformation and content hashing
//! - [`pipeline`] - The poll loop and per-iteration transactions
//!
//! # Iteration Workflow
//!
//! 1. **Fetch**: Download and decode the GTFS-realtime feed
//! 2. **Transform**: Build one hash-identified document per entity
//! 3. **Index**: Bulk-create the documents in Elasticsearch
//! 4. **Report**: Close the iteration's transaction as success or failure
//! 5. **Sleep**: Wait the configured interval
//!
//! # Example
//!
//! ```rust,no_run
//! use railpos::adapters::elasticsearch::{BulkIndexer, ElasticsearchClient};
//! use railpos::adapters::feed::HttpFeedClient;
//! use railpos::config::load_config;
//! use railpos::core::pipeline::{LogTransactionSink, Pipeline, PipelineSettings};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("railpos.toml")?;
//!
//! let feed = HttpFeedClient::new(&config.feed)?;
//! let client = ElasticsearchClient::new(&config.elasticsearch)?;
//! let indexer = BulkIndexer::new(client, config.elasticsearch.bulk_chunk_size);
//!
//! let pipeline = Pipeline::new(
//!     PipelineSettings::from(&config),
//!     Arc::new(feed),
//!     Arc::new(indexer),
//!     Arc::new(LogTransactionSink),
//! );
//!
//! let outcome = pipeline.run_iteration().await;
//! println!("Iteration: {outcome}");
//! # Ok(())
//! # }
//! ```

pub mod pipeline;
pub mod transform;
