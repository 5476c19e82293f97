//! Bulk create operations for Elasticsearch
//!
//! Each document becomes one `create` action keyed by its content hash, so
//! re-sending an unchanged vehicle position is rejected by the cluster as a
//! version conflict instead of producing a second record.

use super::client::ElasticsearchClient;
use super::DocumentIndexer;
use crate::domain::{Document, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Error type reported for a `create` whose `_id` already exists
pub const VERSION_CONFLICT: &str = "version_conflict_engine_exception";

/// Parsed `_bulk` response body
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    /// True when at least one item failed
    #[serde(default)]
    pub errors: bool,

    /// One single-key map per action, keyed by the action name
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkItem>>,
}

/// Outcome of one bulk action
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,

    pub status: u16,

    #[serde(default)]
    pub error: Option<BulkItemError>,
}

/// Error detail of a rejected bulk action
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub error_type: String,

    #[serde(default)]
    pub reason: Option<String>,
}

impl BulkItem {
    /// A `create` refused because the document already exists
    pub fn is_duplicate(&self) -> bool {
        self.status == 409
            || self
                .error
                .as_ref()
                .is_some_and(|e| e.error_type == VERSION_CONFLICT)
    }
}

/// Details of a document the cluster refused
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemFailure {
    /// Document `_id` (content hash)
    pub document_id: String,

    /// HTTP status of the item
    pub status: u16,

    /// Error type and reason
    pub error: String,
}

/// Summary of one call to [`DocumentIndexer::index`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexReport {
    /// Documents newly stored
    pub created: usize,

    /// Documents already present under the same hash
    pub duplicates: usize,

    /// Documents rejected for any other reason
    pub failed: usize,

    /// Details of rejected documents
    pub failures: Vec<BulkItemFailure>,

    /// Set when a request failed as a whole; later chunks were not sent
    pub transport_error: Option<String>,
}

impl IndexReport {
    /// Documents the cluster answered for
    pub fn acknowledged(&self) -> usize {
        self.created + self.duplicates + self.failed
    }

    /// True when every chunk reached the cluster
    pub fn is_complete(&self) -> bool {
        self.transport_error.is_none()
    }

    fn record(&mut self, action: &str, item: &BulkItem) {
        let document_id = item.id.clone().unwrap_or_default();

        if (200..300).contains(&item.status) {
            self.created += 1;
        } else if item.is_duplicate() {
            self.duplicates += 1;
            tracing::info!(
                hash = %document_id,
                status = item.status,
                "Document already indexed"
            );
        } else {
            let error = item
                .error
                .as_ref()
                .map(|e| match e.reason {
                    Some(ref reason) => format!("{}: {}", e.error_type, reason),
                    None => e.error_type.clone(),
                })
                .unwrap_or_else(|| format!("{action} returned status {}", item.status));

            tracing::error!(
                hash = %document_id,
                status = item.status,
                error = %error,
                "Document rejected by Elasticsearch"
            );

            self.failed += 1;
            self.failures.push(BulkItemFailure {
                document_id,
                status: item.status,
                error,
            });
        }
    }
}

/// Builds the NDJSON body for a chunk of create actions
///
/// ```text
/// {"create":{"_id":"<hash>","_index":"<index>"}}
/// {...document...}
/// ```
pub fn build_bulk_body(index: &str, documents: &[Document]) -> Result<String> {
    let mut body = String::new();

    for document in documents {
        let action = json!({"create": {"_index": index, "_id": document.hash()}});
        let source = serde_json::to_string(document)?;
        // Writing to a String cannot fail
        let _ = writeln!(body, "{action}");
        let _ = writeln!(body, "{source}");
    }

    Ok(body)
}

/// Sends documents to Elasticsearch in fixed-size chunks
pub struct BulkIndexer {
    client: ElasticsearchClient,
    chunk_size: usize,
}

impl BulkIndexer {
    /// Creates an indexer; a `chunk_size` of zero is treated as one
    pub fn new(client: ElasticsearchClient, chunk_size: usize) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Underlying client
    pub fn client(&self) -> &ElasticsearchClient {
        &self.client
    }

    async fn send_chunk(
        &self,
        target_index: &str,
        chunk: &[Document],
        report: &mut IndexReport,
    ) -> Result<()> {
        let body = build_bulk_body(target_index, chunk)?;
        let response = self.client.bulk(body).await?;

        for entry in &response.items {
            for (action, item) in entry {
                report.record(action, item);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentIndexer for BulkIndexer {
    async fn index(&self, documents: &[Document], target_index: &str) -> IndexReport {
        let mut report = IndexReport::default();

        for (chunk_number, chunk) in documents.chunks(self.chunk_size).enumerate() {
            if let Err(e) = self.send_chunk(target_index, chunk, &mut report).await {
                tracing::error!(
                    index = %target_index,
                    chunk = chunk_number,
                    documents = chunk.len(),
                    error = %e,
                    "Bulk request failed; remaining documents not sent"
                );
                report.transport_error = Some(e.to_string());
                break;
            }
        }

        tracing::info!(
            index = %target_index,
            documents = documents.len(),
            created = report.created,
            duplicates = report.duplicates,
            failed = report.failed,
            complete = report.is_complete(),
            "Bulk indexing finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, ElasticsearchConfig};
    use mockito::Matcher;
    use serde_json::{Map, Value};

    fn document(hash: &str) -> Document {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::String(hash.to_string()));
        Document::new(
            fields,
            hash.to_string(),
            None,
            "2024-09-16T15:20:00Z".to_string(),
        )
    }

    fn indexer_for(url: String, chunk_size: usize) -> BulkIndexer {
        let config = ElasticsearchConfig {
            url,
            username: "elastic".to_string(),
            password: secret_string("changeme".to_string()),
            index_name: "wmata-rail-position".to_string(),
            bulk_chunk_size: chunk_size,
            timeout_seconds: 5,
        };
        BulkIndexer::new(ElasticsearchClient::new(&config).unwrap(), chunk_size)
    }

    fn created(id: &str) -> Value {
        json!({"create": {"_index": "wmata-rail-position", "_id": id, "status": 201, "result": "created"}})
    }

    fn conflict(id: &str) -> Value {
        json!({"create": {
            "_index": "wmata-rail-position",
            "_id": id,
            "status": 409,
            "error": {
                "type": VERSION_CONFLICT,
                "reason": format!("[{id}]: version conflict, document already exists")
            }
        }})
    }

    #[test]
    fn test_build_bulk_body() {
        let body = build_bulk_body("idx", &[document("a"), document("b")]).unwrap();
        let lines: Vec<Value> = body
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], json!({"create": {"_index": "idx", "_id": "a"}}));
        assert_eq!(lines[1]["hash"], json!("a"));
        assert_eq!(lines[2], json!({"create": {"_index": "idx", "_id": "b"}}));
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_bulk_item_duplicate_detection() {
        let item: BulkItem = serde_json::from_value(conflict("x")["create"].clone()).unwrap();
        assert!(item.is_duplicate());

        let item: BulkItem = serde_json::from_value(created("x")["create"].clone()).unwrap();
        assert!(!item.is_duplicate());
    }

    #[tokio::test]
    async fn test_one_duplicate_out_of_five() {
        let mut server = mockito::Server::new_async().await;
        let response = json!({
            "took": 3,
            "errors": true,
            "items": [created("h0"), created("h1"), conflict("h2"), created("h3"), created("h4")]
        });
        let mock = server
            .mock("POST", "/_bulk")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response.to_string())
            .expect(1)
            .create_async()
            .await;

        let indexer = indexer_for(server.url(), 500);
        let documents: Vec<Document> = (0..5).map(|i| document(&format!("h{i}"))).collect();
        let report = indexer.index(&documents, "wmata-rail-position").await;

        mock.assert_async().await;
        assert_eq!(report.created, 4);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.failed, 0);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_indexing_same_document_twice_reports_duplicate() {
        let mut server = mockito::Server::new_async().await;
        let indexer = indexer_for(server.url(), 500);
        let documents = vec![document("h0")];

        let first = server
            .mock("POST", "/_bulk")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"errors": false, "items": [created("h0")]}).to_string())
            .expect(1)
            .create_async()
            .await;
        let report = indexer.index(&documents, "wmata-rail-position").await;
        first.assert_async().await;
        first.remove_async().await;

        assert_eq!(report.created, 1);
        assert_eq!(report.duplicates, 0);

        let second = server
            .mock("POST", "/_bulk")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"errors": true, "items": [conflict("h0")]}).to_string())
            .expect(1)
            .create_async()
            .await;
        let report = indexer.index(&documents, "wmata-rail-position").await;
        second.assert_async().await;

        assert_eq!(report.created, 0);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.failed, 0);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_rejected_item_is_counted_as_failure() {
        let mut server = mockito::Server::new_async().await;
        let response = json!({
            "errors": true,
            "items": [
                created("h0"),
                {"create": {"_id": "h1", "status": 400, "error": {"type": "mapper_parsing_exception", "reason": "failed to parse field [location]"}}}
            ]
        });
        let _mock = server
            .mock("POST", "/_bulk")
            .with_status(200)
            .with_body(response.to_string())
            .create_async()
            .await;

        let indexer = indexer_for(server.url(), 500);
        let report = indexer
            .index(&[document("h0"), document("h1")], "wmata-rail-position")
            .await;

        assert_eq!(report.created, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].document_id, "h1");
        assert_eq!(report.failures[0].status, 400);
        assert!(report.failures[0].error.contains("mapper_parsing_exception"));
    }

    #[tokio::test]
    async fn test_documents_are_sent_in_chunks() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for ids in [vec!["h0", "h1"], vec!["h2", "h3"], vec!["h4"]] {
            let items: Vec<Value> = ids.iter().map(|id| created(id)).collect();
            let mock = server
                .mock("POST", "/_bulk")
                .match_body(Matcher::Regex(format!(r#""_id":"{}""#, ids[0])))
                .with_status(200)
                .with_body(json!({"errors": false, "items": items}).to_string())
                .expect(1)
                .create_async()
                .await;
            mocks.push(mock);
        }

        let indexer = indexer_for(server.url(), 2);
        let documents: Vec<Document> = (0..5).map(|i| document(&format!("h{i}"))).collect();
        let report = indexer.index(&documents, "wmata-rail-position").await;

        for mock in mocks {
            mock.assert_async().await;
        }
        assert_eq!(report.created, 5);
        assert_eq!(report.acknowledged(), 5);
    }

    #[tokio::test]
    async fn test_transport_failure_abandons_remaining_chunks() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/_bulk")
            .match_body(Matcher::Regex(r#""_id":"h0""#.to_string()))
            .with_status(503)
            .with_body("cluster unavailable")
            .expect(1)
            .create_async()
            .await;
        let rest = server
            .mock("POST", "/_bulk")
            .match_body(Matcher::Regex(r#""_id":"h2""#.to_string()))
            .with_status(200)
            .with_body(json!({"errors": false, "items": []}).to_string())
            .expect(0)
            .create_async()
            .await;

        let indexer = indexer_for(server.url(), 2);
        let documents: Vec<Document> = (0..5).map(|i| document(&format!("h{i}"))).collect();
        let report = indexer.index(&documents, "wmata-rail-position").await;

        first.assert_async().await;
        rest.assert_async().await;
        assert!(!report.is_complete());
        assert!(report
            .transport_error
            .as_deref()
            .is_some_and(|e| e.contains("503")));
        assert_eq!(report.acknowledged(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_response_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/_bulk")
            .with_status(200)
            .with_body("<html>proxy error</html>")
            .create_async()
            .await;

        let indexer = indexer_for(server.url(), 500);
        let report = indexer.index(&[document("h0")], "wmata-rail-position").await;

        assert!(report.transport_error.is_some());
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/_bulk")
            .expect(0)
            .create_async()
            .await;

        let indexer = indexer_for(server.url(), 500);
        let report = indexer.index(&[], "wmata-rail-position").await;

        mock.assert_async().await;
        assert_eq!(report, IndexReport::default());
    }
}
