//! Configuration schema types
//!
//! This module defines the configuration structure for railpos. Required
//! settings have no serde default, so a missing key fails at parse time;
//! [`RailposConfig::validate`] then rejects present-but-empty values.

use crate::config::SecretString;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Main railpos configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailposConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Service identity reported to APM
    pub service: ServiceConfig,

    /// Upstream feed settings
    pub feed: FeedConfig,

    /// Elasticsearch storage settings
    pub elasticsearch: ElasticsearchConfig,

    /// APM intake settings
    #[serde(default)]
    pub apm: ApmConfig,

    /// Kibana settings (only needed by `annotate`)
    #[serde(default)]
    pub kibana: KibanaConfig,

    /// Poll loop settings
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RailposConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.service.validate()?;
        self.feed.validate()?;
        self.elasticsearch.validate()?;
        self.apm.validate()?;
        self.kibana.validate()?;
        self.pipeline.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Service identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, also the APM transaction name
    pub name: String,

    /// Deployed version
    pub version: String,

    /// Deployment environment (e.g. production)
    pub environment: String,
}

impl ServiceConfig {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("service.name", &self.name)?;
        require_non_empty("service.version", &self.version)?;
        require_non_empty("service.environment", &self.environment)?;
        Ok(())
    }
}

/// GTFS-realtime feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Vehicle positions endpoint
    pub url: String,

    /// API key sent in the `api_key` header
    pub api_key: SecretString,

    /// Request timeout in seconds
    #[serde(default = "default_feed_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl FeedConfig {
    fn validate(&self) -> Result<(), String> {
        require_http_url("feed.url", &self.url)?;
        require_secret("feed.api_key", &self.api_key)?;
        if self.timeout_seconds == 0 {
            return Err("feed.timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Elasticsearch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Cluster URL
    pub url: String,

    /// Basic auth username
    pub username: String,

    /// Basic auth password
    /// Stored securely in memory and automatically zeroized on drop
    pub password: SecretString,

    /// Target index
    pub index_name: String,

    /// Create actions per bulk request
    #[serde(default = "default_bulk_chunk_size")]
    pub bulk_chunk_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_es_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl ElasticsearchConfig {
    fn validate(&self) -> Result<(), String> {
        require_http_url("elasticsearch.url", &self.url)?;
        require_non_empty("elasticsearch.username", &self.username)?;
        require_secret("elasticsearch.password", &self.password)?;
        require_non_empty("elasticsearch.index_name", &self.index_name)?;

        if self.bulk_chunk_size == 0 || self.bulk_chunk_size > 10_000 {
            return Err(format!(
                "elasticsearch.bulk_chunk_size must be between 1 and 10000, got {}",
                self.bulk_chunk_size
            ));
        }
        if self.timeout_seconds == 0 {
            return Err("elasticsearch.timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Elastic APM intake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApmConfig {
    /// Send transactions to the APM server
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// APM server URL
    #[serde(default)]
    pub server_url: Option<String>,

    /// Secret token for the intake API
    #[serde(default)]
    pub secret_token: Option<SecretString>,

    /// Intake request timeout in seconds
    #[serde(default = "default_apm_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ApmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server_url: None,
            secret_token: None,
            timeout_seconds: default_apm_timeout_seconds(),
        }
    }
}

impl ApmConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }

        match self.server_url {
            Some(ref url) => require_http_url("apm.server_url", url)?,
            None => return Err("APM enabled but apm.server_url not provided".to_string()),
        }
        match self.secret_token {
            Some(ref token) => require_secret("apm.secret_token", token)?,
            None => return Err("APM enabled but apm.secret_token not provided".to_string()),
        }
        Ok(())
    }

    /// Intake request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Kibana configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KibanaConfig {
    /// Kibana URL
    #[serde(default)]
    pub url: Option<String>,
}

impl KibanaConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref url) = self.url {
            require_http_url("kibana.url", url)?;
        }
        Ok(())
    }
}

/// What the transformer does with an entity it cannot turn into a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRecordPolicy {
    /// Log and drop the entity, keep the rest of the batch
    #[default]
    Skip,
    /// Fail the whole transform step for the iteration
    Abort,
}

impl FromStr for MalformedRecordPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            _ => Err(format!(
                "Invalid malformed record policy '{s}'. Must be one of: skip, abort"
            )),
        }
    }
}

impl std::fmt::Display for MalformedRecordPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Seconds to sleep between iterations
    pub sleep_duration_seconds: u64,

    /// Malformed entity handling
    #[serde(default)]
    pub malformed_records: MalformedRecordPolicy,
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        if self.sleep_duration_seconds == 0 {
            return Err("pipeline.sleep_duration_seconds must be > 0".to_string());
        }
        Ok(())
    }

    /// Sleep interval as a [`Duration`]
    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(self.sleep_duration_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Console output as JSON lines (plain text otherwise)
    #[serde(default = "default_true")]
    pub json: bool,

    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: true,
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn require_non_empty(key: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{key} cannot be empty"));
    }
    Ok(())
}

fn require_secret(key: &str, value: &SecretString) -> Result<(), String> {
    if value.expose_secret().is_empty() {
        return Err(format!("{key} cannot be empty"));
    }
    Ok(())
}

fn require_http_url(key: &str, value: &str) -> Result<(), String> {
    require_non_empty(key, value)?;

    let parsed = url::Url::parse(value).map_err(|e| format!("{key} is not a valid URL: {e}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("{key} must start with http:// or https://"));
    }
    Ok(())
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_feed_timeout_seconds() -> u64 {
    30
}

fn default_es_timeout_seconds() -> u64 {
    60
}

fn default_apm_timeout_seconds() -> u64 {
    10
}

fn default_bulk_chunk_size() -> usize {
    500
}

fn default_local_path() -> String {
    "/var/log/railpos".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::secret_string;

    pub(crate) fn valid_config() -> RailposConfig {
        RailposConfig {
            application: ApplicationConfig::default(),
            service: ServiceConfig {
                name: "wmata-rail-position".to_string(),
                version: "1.0.0".to_string(),
                environment: "production".to_string(),
            },
            feed: FeedConfig {
                url: "https://api.wmata.com/gtfs/rail-gtfsrt-vehiclepositions.pb".to_string(),
                api_key: secret_string("feed-key".to_string()),
                timeout_seconds: 30,
            },
            elasticsearch: ElasticsearchConfig {
                url: "https://es.example.com:9200".to_string(),
                username: "elastic".to_string(),
                password: secret_string("changeme".to_string()),
                index_name: "wmata-rail-position".to_string(),
                bulk_chunk_size: 500,
                timeout_seconds: 60,
            },
            apm: ApmConfig {
                enabled: true,
                server_url: Some("https://apm.example.com".to_string()),
                secret_token: Some(secret_string("apm-token".to_string())),
                timeout_seconds: 10,
            },
            kibana: KibanaConfig::default(),
            pipeline: PipelineConfig {
                sleep_duration_seconds: 10,
                malformed_records: MalformedRecordPolicy::Skip,
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = valid_config();
        config.application.log_level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Invalid log_level"));
    }

    #[test]
    fn test_service_config_requires_values() {
        let mut config = valid_config();
        config.service.version = "  ".to_string();
        assert_eq!(
            config.validate().unwrap_err(),
            "service.version cannot be empty"
        );
    }

    #[test]
    fn test_feed_config_validation() {
        let mut config = valid_config();
        config.feed.url = "ftp://api.wmata.com/feed.pb".to_string();
        assert!(config.validate().unwrap_err().contains("http://"));

        let mut config = valid_config();
        config.feed.api_key = secret_string(String::new());
        assert_eq!(config.validate().unwrap_err(), "feed.api_key cannot be empty");
    }

    #[test]
    fn test_elasticsearch_chunk_size_bounds() {
        let mut config = valid_config();
        config.elasticsearch.bulk_chunk_size = 0;
        assert!(config.validate().is_err());

        config.elasticsearch.bulk_chunk_size = 10_001;
        assert!(config.validate().is_err());

        config.elasticsearch.bulk_chunk_size = 10_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apm_config_validation() {
        let mut config = valid_config();
        config.apm.secret_token = None;
        assert!(config.validate().unwrap_err().contains("apm.secret_token"));

        // Disabled APM needs nothing else
        config.apm.enabled = false;
        config.apm.server_url = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_sleep_must_be_positive() {
        let mut config = valid_config();
        config.pipeline.sleep_duration_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_record_policy_from_str() {
        assert_eq!(
            MalformedRecordPolicy::from_str("skip").unwrap(),
            MalformedRecordPolicy::Skip
        );
        assert_eq!(
            MalformedRecordPolicy::from_str("ABORT").unwrap(),
            MalformedRecordPolicy::Abort
        );
        assert!(MalformedRecordPolicy::from_str("ignore").is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(config.json);
        assert!(!config.local_enabled);
        assert_eq!(config.local_rotation, "daily");
    }

    #[test]
    fn test_kibana_url_is_checked_when_present() {
        let mut config = valid_config();
        config.kibana.url = Some("not a url".to_string());
        assert!(config.validate().unwrap_err().contains("kibana.url"));
    }
}
