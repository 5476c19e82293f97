//! External system integrations for railpos.
//!
//! - [`feed`] - GTFS-realtime feed over HTTP
//! - [`elasticsearch`] - Elasticsearch bulk indexing
//! - [`kibana`] - APM deployment annotations through Kibana
//!
//! # Design Pattern
//!
//! Each adapter sits behind a trait ([`feed::FeedSource`],
//! [`elasticsearch::DocumentIndexer`]) so the pipeline can be driven by
//! in-memory fakes in tests.
//!
//! ```rust,no_run
//! use railpos::adapters::elasticsearch::{BulkIndexer, ElasticsearchClient};
//! use railpos::adapters::feed::HttpFeedClient;
//! use railpos::config::load_config;
//!
//! # async fn example() -> railpos::domain::Result<()> {
//! let config = load_config("railpos.toml")?;
//!
//! let feed = HttpFeedClient::new(&config.feed)?;
//! let client = ElasticsearchClient::new(&config.elasticsearch)?;
//! client.ping().await?;
//! let indexer = BulkIndexer::new(client, config.elasticsearch.bulk_chunk_size);
//! # Ok(())
//! # }
//! ```

pub mod elasticsearch;
pub mod feed;
pub mod kibana;
