//! Elasticsearch storage adapter
//!
//! Documents are written with the `_bulk` API as create-if-absent operations.
//! Per-document rejections, including the expected duplicates, never fail
//! the batch; see [`IndexReport`].

pub mod bulk;
pub mod client;

pub use bulk::{build_bulk_body, BulkIndexer, BulkItemFailure, IndexReport};
pub use client::ElasticsearchClient;

use crate::domain::Document;
use async_trait::async_trait;

/// Best-effort sink for transformed documents
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Writes `documents` to `target_index`
    ///
    /// Never returns an error: per-document and transport failures are
    /// logged and summarized in the returned report.
    async fn index(&self, documents: &[Document], target_index: &str) -> IndexReport;
}
