// railpos - GTFS-realtime vehicle positions to Elasticsearch
// Copyright (c) 2025 Railpos Contributors
// Licensed under the MIT License

//! # railpos - GTFS-realtime vehicle positions to Elasticsearch
//!
//! railpos polls a GTFS-realtime vehicle positions feed forever and stores
//! every position in Elasticsearch as a hash-identified document, so that
//! re-fetching an unchanged position never creates a second record.
//!
//! ## Overview
//!
//! Each iteration:
//! - **Fetches** the protobuf feed with an API key header
//! - **Transforms** every entity into a JSON document with a content hash,
//!   an optional `location` geo point and an `@timestamp`
//! - **Indexes** the documents with `_bulk` create actions keyed by hash
//! - **Reports** the iteration as an Elastic APM transaction
//!
//! then sleeps for the configured interval.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (transform, poll loop)
//! - [`adapters`] - External integrations (feed, Elasticsearch, Kibana)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and APM reporting
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use railpos::adapters::elasticsearch::ElasticsearchClient;
//! use railpos::cli::commands::run::build_pipeline;
//! use railpos::config::load_config_with_secrets;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config_with_secrets("railpos.toml", Some(".secrets.toml"))?;
//!
//!     let client = ElasticsearchClient::new(&config.elasticsearch)?;
//!     client.ping().await?;
//!
//!     let pipeline = build_pipeline(&config, client)?;
//!     pipeline.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Fallible library code returns [`domain::Result`]. Inside the loop every
//! error is contained in its iteration; only configuration problems and an
//! unreachable cluster at startup stop the process.
//!
//! ```rust,no_run
//! use railpos::domain::RailposError;
//!
//! fn example() -> Result<(), RailposError> {
//!     let config = railpos::config::load_config("railpos.toml")?;
//!     println!("Polling {}", config.feed.url);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
