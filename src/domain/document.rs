//! Storage-ready documents
//!
//! A [`Document`] is the transformed form of one feed entity. Its JSON body
//! holds every entity field plus the derived `hash`, optional `location` and
//! `@timestamp` fields. The hash doubles as the storage identity key.

use serde::Serialize;
use serde_json::{Map, Value};

/// Field holding the content hash
pub const HASH_FIELD: &str = "hash";

/// Field holding the `{lat, lon}` geo point
pub const LOCATION_FIELD: &str = "location";

/// Field holding the observation time
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// A normalized, hash-identified record ready for indexing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document {
    body: Map<String, Value>,
}

/// A geo point in the shape Elasticsearch expects for `geo_point` objects
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl Document {
    /// Builds a document from entity fields and the derived values
    pub fn new(
        mut fields: Map<String, Value>,
        hash: String,
        location: Option<GeoPoint>,
        timestamp: String,
    ) -> Self {
        fields.insert(HASH_FIELD.to_string(), Value::String(hash));
        if let Some(point) = location {
            let mut geo = Map::new();
            geo.insert("lon".to_string(), Value::from(point.lon));
            geo.insert("lat".to_string(), Value::from(point.lat));
            fields.insert(LOCATION_FIELD.to_string(), Value::Object(geo));
        }
        fields.insert(TIMESTAMP_FIELD.to_string(), Value::String(timestamp));
        Self { body: fields }
    }

    /// The content hash, also used as the document `_id`
    pub fn hash(&self) -> &str {
        self.body
            .get(HASH_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The `@timestamp` value
    pub fn timestamp(&self) -> Option<&str> {
        self.body.get(TIMESTAMP_FIELD).and_then(Value::as_str)
    }

    /// The geo point, when the entity carried usable coordinates
    pub fn location(&self) -> Option<GeoPoint> {
        let geo = self.body.get(LOCATION_FIELD)?;
        Some(GeoPoint {
            lat: geo.get("lat")?.as_f64()?,
            lon: geo.get("lon")?.as_f64()?,
        })
    }

    /// Full JSON body as sent to storage
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Looks up a top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }
}
