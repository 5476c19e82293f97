//! Configuration management for railpos.
//!
//! Settings and secrets are read from TOML. Secrets usually live in a
//! separate file that is merged over the settings file, and any value may be
//! taken from the environment with `${VAR_NAME}` substitution or a
//! `RAILPOS_<SECTION>_<KEY>` override.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use railpos::config::load_config_with_secrets;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config_with_secrets("railpos.toml", Some(".secrets.toml"))?;
//!
//! println!("Feed: {}", config.feed.url);
//! println!("Index: {}", config.elasticsearch.index_name);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`ServiceConfig`] - Service identity reported to APM and Kibana
//! - [`FeedConfig`] - Feed URL, API key and request timeout
//! - [`ElasticsearchConfig`] - Cluster URL, credentials, index and bulk sizing
//! - [`ApmConfig`] - APM intake server and token
//! - [`KibanaConfig`] - Kibana URL for deployment annotations
//! - [`PipelineConfig`] - Poll interval and malformed record policy
//! - [`LoggingConfig`] - Console format and optional rolling file
//!
//! # Example Configuration
//!
//! ```toml
//! [service]
//! name = "wmata-rail-position"
//! version = "1.0.0"
//! environment = "production"
//!
//! [feed]
//! url = "https://api.wmata.com/gtfs/rail-gtfsrt-vehiclepositions.pb"
//! api_key = "${WMATA_API_KEY}"
//!
//! [elasticsearch]
//! url = "https://localhost:9200"
//! username = "elastic"
//! password = "${ES_PASSWORD}"
//! index_name = "wmata-rail-position"
//!
//! [apm]
//! server_url = "https://localhost:8200"
//! secret_token = "${APM_SECRET_TOKEN}"
//!
//! [pipeline]
//! sleep_duration_seconds = 10
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_with_secrets};
pub use schema::{
    ApmConfig, ApplicationConfig, ElasticsearchConfig, FeedConfig, KibanaConfig, LoggingConfig,
    MalformedRecordPolicy, PipelineConfig, RailposConfig, ServiceConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
