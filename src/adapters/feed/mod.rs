//! GTFS-realtime feed adapter
//!
//! [`FeedSource`] abstracts where feed bytes come from so the pipeline can be
//! driven by an HTTP endpoint in production and by canned messages in tests.
//! [`HttpFeedClient`] is the production implementation.

pub mod client;

pub use client::HttpFeedClient;

use crate::domain::{FeedError, FeedMessage, Result};
use async_trait::async_trait;
use bytes::Bytes;
use prost::Message;

/// A source of GTFS-realtime feed messages
///
/// Any failure to obtain or decode a message is reported as
/// [`RailposError::Feed`](crate::domain::RailposError::Feed), which the
/// pipeline treats as the feed being unavailable for that iteration.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches the raw protobuf payload
    async fn fetch_raw(&self) -> Result<Bytes>;

    /// Decodes a protobuf payload into a [`FeedMessage`]
    fn decode(&self, payload: &[u8]) -> Result<FeedMessage> {
        FeedMessage::decode(payload).map_err(|e| FeedError::from(e).into())
    }

    /// Fetches and decodes the current feed snapshot
    async fn fetch(&self) -> Result<FeedMessage> {
        let payload = self.fetch_raw().await?;
        let message = self.decode(&payload)?;

        tracing::debug!(
            bytes = payload.len(),
            entities = message.entity.len(),
            "Decoded feed message"
        );

        Ok(message)
    }
}
