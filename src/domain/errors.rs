//! Domain error types
//!
//! This module defines the error hierarchy for railpos.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main railpos error type
///
/// Steady-state pipeline code contains these errors inside the iteration that
/// produced them; only configuration and startup connectivity errors end the
/// process.
#[derive(Debug, Error)]
pub enum RailposError {
    /// Configuration-related errors (missing or invalid settings and secrets)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Feed fetch or decode errors
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Elasticsearch-related errors
    #[error("Elasticsearch error: {0}")]
    Elasticsearch(#[from] ElasticsearchError),

    /// APM intake or Kibana annotation errors
    #[error("APM error: {0}")]
    Apm(String),

    /// A feed entity that lacks fields the document model requires
    #[error("Malformed record: {0}")]
    MalformedRecord(#[from] MalformedRecord),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Feed-specific errors
///
/// Every variant maps to the `Unavailable` outcome of a fetch.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The request never produced a response
    #[error("Failed to reach feed endpoint: {0}")]
    ConnectionFailed(String),

    /// The endpoint answered with a non-success status
    #[error("Feed endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The body could not be decoded as a GTFS-realtime message
    #[error("Failed to decode feed message: {0}")]
    Decode(String),

    /// Request timeout
    #[error("Feed request timeout: {0}")]
    Timeout(String),
}

/// Elasticsearch-specific errors
///
/// These are transport-level failures; per-document rejections are reported
/// through the bulk report instead.
#[derive(Debug, Error)]
pub enum ElasticsearchError {
    /// Failed to connect to the cluster
    #[error("Failed to connect to Elasticsearch: {0}")]
    ConnectionFailed(String),

    /// Authentication failed (401/403)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The bulk endpoint rejected the whole request
    #[error("Bulk request failed with status {status}: {message}")]
    BulkRejected { status: u16, message: String },

    /// The bulk response could not be parsed
    #[error("Invalid bulk response: {0}")]
    InvalidResponse(String),

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

/// A feed entity that cannot be turned into a document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("entity '{entity_id}': {reason}")]
pub struct MalformedRecord {
    /// Entity id as published by the feed (may be empty)
    pub entity_id: String,

    /// What is missing or out of range
    pub reason: String,
}

impl MalformedRecord {
    /// Creates a new malformed record condition
    pub fn new(entity_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            FeedError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FeedError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<reqwest::Error> for ElasticsearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ElasticsearchError::Timeout(err.to_string())
        } else {
            ElasticsearchError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<prost::DecodeError> for FeedError {
    fn from(err: prost::DecodeError) -> Self {
        FeedError::Decode(err.to_string())
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for RailposError {
    fn from(err: std::io::Error) -> Self {
        RailposError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for RailposError {
    fn from(err: serde_json::Error) -> Self {
        RailposError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for RailposError {
    fn from(err: toml::de::Error) -> Self {
        RailposError::Configuration(format!("TOML parse error: {err}"))
    }
}
