//! Per-iteration transactions
//!
//! Every poll iteration is recorded as one [`Transaction`] of type `script`
//! holding a span per phase and any errors captured along the way. When the
//! iteration ends the transaction is handed to a [`TransactionSink`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Transaction type for poll iterations
pub const TRANSACTION_TYPE: &str = "script";

/// Result of an iteration or of one of its phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Lowercase label used for transaction results
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished phase of an iteration
#[derive(Debug, Clone)]
pub struct SpanRecord {
    pub id: String,
    pub name: &'static str,
    pub span_type: &'static str,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub outcome: Outcome,
    pub labels: Map<String, Value>,
}

/// An error captured during an iteration
#[derive(Debug, Clone)]
pub struct CapturedError {
    pub id: String,
    /// Span that was open when the error occurred
    pub culprit: &'static str,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// A phase in progress; close it with [`Transaction::finish_span`]
#[derive(Debug)]
pub struct OpenSpan {
    name: &'static str,
    span_type: &'static str,
    started_at: DateTime<Utc>,
    started: Instant,
}

/// One poll iteration as reported to the observability sink
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub trace_id: String,
    pub name: String,
    pub transaction_type: &'static str,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub result: Option<Outcome>,
    pub spans: Vec<SpanRecord>,
    pub errors: Vec<CapturedError>,
    started: Instant,
}

impl Transaction {
    /// Opens a `script` transaction named after the service
    pub fn begin(name: impl Into<String>) -> Self {
        Self {
            id: short_id(),
            trace_id: Uuid::new_v4().simple().to_string(),
            name: name.into(),
            transaction_type: TRANSACTION_TYPE,
            started_at: Utc::now(),
            duration: Duration::ZERO,
            result: None,
            spans: Vec::new(),
            errors: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Starts timing a phase
    pub fn start_span(&self, name: &'static str, span_type: &'static str) -> OpenSpan {
        OpenSpan {
            name,
            span_type,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Records a finished phase
    pub fn finish_span(
        &mut self,
        span: OpenSpan,
        outcome: Outcome,
        labels: Map<String, Value>,
    ) -> &SpanRecord {
        let index = self.spans.len();
        self.spans.push(SpanRecord {
            id: short_id(),
            name: span.name,
            span_type: span.span_type,
            started_at: span.started_at,
            duration: span.started.elapsed(),
            outcome,
            labels,
        });
        &self.spans[index]
    }

    /// Captures an error raised in `culprit`
    pub fn capture_error(&mut self, culprit: &'static str, error: &dyn fmt::Display) {
        self.errors.push(CapturedError {
            id: Uuid::new_v4().simple().to_string(),
            culprit,
            message: error.to_string(),
            occurred_at: Utc::now(),
        });
    }

    /// Closes the transaction with its result
    pub fn end(&mut self, outcome: Outcome) {
        self.duration = self.started.elapsed();
        self.result = Some(outcome);
    }

    /// Looks up a recorded span by name
    pub fn span(&self, name: &str) -> Option<&SpanRecord> {
        self.spans.iter().find(|s| s.name == name)
    }
}

/// 16 hex characters, the id width used for spans and transactions
fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

/// Destination for finished transactions
///
/// Reporting is fire-and-forget: implementations log their own failures and
/// must never influence the pipeline.
#[async_trait]
pub trait TransactionSink: Send + Sync {
    async fn report(&self, transaction: &Transaction);
}

/// Sink that only writes transactions to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransactionSink;

#[async_trait]
impl TransactionSink for LogTransactionSink {
    async fn report(&self, transaction: &Transaction) {
        tracing::info!(
            transaction = %transaction.name,
            transaction_type = transaction.transaction_type,
            result = transaction.result.map(|o| o.as_str()).unwrap_or("unknown"),
            duration_ms = transaction.duration.as_millis() as u64,
            spans = transaction.spans.len(),
            errors = transaction.errors.len(),
            "Transaction finished"
        );
    }
}
