//! HTTP client for the GTFS-realtime vehicle positions endpoint

use super::FeedSource;
use crate::config::FeedConfig;
use crate::domain::{FeedError, RailposError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Header carrying the feed provider's API key
pub const API_KEY_HEADER: &str = "api_key";

/// Fetches the feed over HTTP with an API key header
///
/// # Example
///
/// ```no_run
/// use railpos::adapters::feed::{FeedSource, HttpFeedClient};
/// use railpos::config::{secret_string, FeedConfig};
///
/// # async fn example() -> railpos::domain::Result<()> {
/// let config = FeedConfig {
///     url: "https://api.wmata.com/gtfs/rail-gtfsrt-vehiclepositions.pb".to_string(),
///     api_key: secret_string("key".to_string()),
///     timeout_seconds: 30,
/// };
///
/// let client = HttpFeedClient::new(&config)?;
/// let message = client.fetch().await?;
/// println!("{} entities", message.entity.len());
/// # Ok(())
/// # }
/// ```
pub struct HttpFeedClient {
    client: Client,
    config: FeedConfig,
}

impl HttpFeedClient {
    /// Creates a client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RailposError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// The endpoint this client polls
    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch_raw(&self) -> Result<Bytes> {
        tracing::debug!(url = %self.config.url, "Requesting feed snapshot");

        let response = self
            .client
            .get(&self.config.url)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret().to_string())
            .send()
            .await
            .map_err(FeedError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Status {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }

        let payload = response.bytes().await.map_err(FeedError::from)?;
        Ok(payload)
    }
}
