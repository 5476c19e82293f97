//! Content hashing for documents
//!
//! The hash identifies an entity by what it says, not when it was fetched:
//! two fetches of an unchanged vehicle position produce the same hash and
//! therefore the same storage `_id`.

use crate::domain::Result;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Calculate the SHA-256 content hash of a JSON value
///
/// Object keys are sorted recursively before serialization, so the result
/// does not depend on field insertion order.
///
/// # Returns
///
/// Returns a hex-encoded SHA-256 hash (64 lowercase characters).
///
/// # Examples
///
/// ```
/// use railpos::core::transform::hash::content_hash;
/// use serde_json::json;
///
/// let a = content_hash(&json!({"id": "1", "vehicle": {"timestamp": 1}})).unwrap();
/// let b = content_hash(&json!({"vehicle": {"timestamp": 1}, "id": "1"})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn content_hash(data: &Value) -> Result<String> {
    let canonical = serde_json::to_string(&canonicalize(data))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let result = hasher.finalize();

    Ok(format!("{result:x}"))
}

/// Recursively sorts object keys; array order is significant and kept
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        _ => value.clone(),
    }
}
