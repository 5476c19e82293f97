//! Record transformation
//!
//! Turns each entity of a decoded [`FeedMessage`] into a [`Document`]:
//!
//! - the entity is rendered as protobuf-style JSON,
//! - `hash` is the content hash of that JSON ([`hash::content_hash`]),
//! - `location` is added when both coordinates are present and non-zero,
//! - `@timestamp` is the vehicle timestamp in UTC
//!   ([`timestamp::format_unix_timestamp`]).
//!
//! Entities that cannot carry a timestamp are malformed. What happens to them
//! is decided by [`MalformedRecordPolicy`].

pub mod hash;
pub mod timestamp;

use crate::config::MalformedRecordPolicy;
use crate::domain::feed::shortest_f64;
use crate::domain::{
    Document, FeedEntity, FeedMessage, GeoPoint, MalformedRecord, RailposError, Result,
};
use serde_json::Value;

pub use hash::content_hash;
pub use timestamp::format_unix_timestamp;

/// Documents produced from one feed message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutput {
    /// Documents in entity arrival order
    pub documents: Vec<Document>,

    /// Entities left out under the `skip` policy
    pub skipped: Vec<MalformedRecord>,
}

/// Transforms every entity of `message`
///
/// # Errors
///
/// Under [`MalformedRecordPolicy::Abort`] the first malformed entity fails
/// the whole call with [`RailposError::MalformedRecord`]. Serialization
/// failures are always returned.
///
/// # Examples
///
/// ```
/// use railpos::config::MalformedRecordPolicy;
/// use railpos::core::transform::transform;
/// use railpos::domain::{FeedEntity, FeedMessage, VehiclePosition};
///
/// let message = FeedMessage {
///     header: None,
///     entity: vec![FeedEntity {
///         id: Some("1".to_string()),
///         is_deleted: None,
///         vehicle: Some(VehiclePosition {
///             timestamp: Some(1_726_500_000),
///             ..Default::default()
///         }),
///     }],
/// };
///
/// let output = transform(&message, MalformedRecordPolicy::Skip).unwrap();
/// assert_eq!(output.documents.len(), 1);
/// assert_eq!(output.documents[0].timestamp(), Some("2024-09-16T15:20:00Z"));
/// ```
pub fn transform(message: &FeedMessage, policy: MalformedRecordPolicy) -> Result<TransformOutput> {
    let mut output = TransformOutput::default();

    for entity in &message.entity {
        match transform_entity(entity) {
            Ok(document) => output.documents.push(document),
            Err(RailposError::MalformedRecord(record))
                if policy == MalformedRecordPolicy::Skip =>
            {
                tracing::warn!(
                    entity_id = %record.entity_id,
                    reason = %record.reason,
                    "Skipping malformed entity"
                );
                output.skipped.push(record);
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(
        entities = message.entity.len(),
        documents = output.documents.len(),
        skipped = output.skipped.len(),
        "Transformed feed message"
    );

    Ok(output)
}

/// Transforms a single entity
///
/// # Errors
///
/// Returns [`RailposError::MalformedRecord`] when the entity has no vehicle,
/// the vehicle has no timestamp, or the timestamp is out of range.
pub fn transform_entity(entity: &FeedEntity) -> Result<Document> {
    let entity_id = entity.id.clone().unwrap_or_default();

    let vehicle = entity
        .vehicle
        .as_ref()
        .ok_or_else(|| MalformedRecord::new(&entity_id, "entity has no vehicle position"))?;

    let seconds = vehicle
        .timestamp
        .ok_or_else(|| MalformedRecord::new(&entity_id, "vehicle position has no timestamp"))?;

    let timestamp = format_unix_timestamp(seconds).ok_or_else(|| {
        MalformedRecord::new(&entity_id, format!("timestamp {seconds} is out of range"))
    })?;

    let fields = match serde_json::to_value(entity)? {
        Value::Object(map) => map,
        other => {
            return Err(RailposError::Serialization(format!(
                "entity rendered as {other} instead of an object"
            )))
        }
    };

    let hash = content_hash(&Value::Object(fields.clone()))?;
    let location = location_of(entity);

    Ok(Document::new(fields, hash, location, timestamp))
}

/// Geo point of an entity when both coordinates are present, finite and
/// non-zero
pub fn location_of(entity: &FeedEntity) -> Option<GeoPoint> {
    let position = entity.vehicle.as_ref()?.position.as_ref()?;
    let usable = |v: &f32| v.is_finite() && *v != 0.0;
    let lat = position.latitude.filter(usable)?;
    let lon = position.longitude.filter(usable)?;

    Some(GeoPoint {
        lat: shortest_f64(lat),
        lon: shortest_f64(lon),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feed::VehicleDescriptor;
    use crate::domain::{Position, VehiclePosition};
    use serde_json::json;
    use test_case::test_case;

    fn entity(id: &str, lat: Option<f32>, lon: Option<f32>, timestamp: Option<u64>) -> FeedEntity {
        FeedEntity {
            id: Some(id.to_string()),
            is_deleted: None,
            vehicle: Some(VehiclePosition {
                position: Some(Position {
                    latitude: lat,
                    longitude: lon,
                    ..Default::default()
                }),
                timestamp,
                vehicle: Some(VehicleDescriptor {
                    id: Some(format!("car-{id}")),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        }
    }

    #[test_case(Some(38.9), Some(-77.0), true ; "both present")]
    #[test_case(None, Some(-77.0), false ; "latitude missing")]
    #[test_case(Some(38.9), None, false ; "longitude missing")]
    #[test_case(Some(0.0), Some(-77.0), false ; "latitude zero")]
    #[test_case(Some(38.9), Some(0.0), false ; "longitude zero")]
    #[test_case(None, None, false ; "both missing")]
    #[test_case(Some(f32::NAN), Some(-77.0), false ; "latitude nan")]
    #[test_case(Some(38.9), Some(f32::INFINITY), false ; "longitude infinite")]
    #[test_case(Some(f32::NEG_INFINITY), Some(-77.0), false ; "latitude negative infinite")]
    fn test_location_presence(lat: Option<f32>, lon: Option<f32>, present: bool) {
        let document = transform_entity(&entity("1", lat, lon, Some(1))).unwrap();
        assert_eq!(document.location().is_some(), present);
    }

    #[test]
    fn test_location_values() {
        let document = transform_entity(&entity("1", Some(38.8951), Some(-77.0364), Some(1))).unwrap();

        assert_eq!(
            document.location(),
            Some(GeoPoint {
                lat: 38.8951,
                lon: -77.0364
            })
        );
        assert_eq!(
            document.get("location"),
            Some(&json!({"lat": 38.8951, "lon": -77.0364}))
        );
    }

    #[test]
    fn test_entity_without_position_has_no_location() {
        let mut e = entity("1", None, None, Some(1));
        if let Some(vehicle) = e.vehicle.as_mut() {
            vehicle.position = None;
        }
        assert!(transform_entity(&e).unwrap().location().is_none());
    }

    #[test]
    fn test_document_keeps_entity_fields() {
        let document = transform_entity(&entity("7", Some(38.9), Some(-77.0), Some(1_726_500_000))).unwrap();

        assert_eq!(document.get("id"), Some(&json!("7")));
        assert_eq!(document.get("vehicle").unwrap()["timestamp"], json!(1_726_500_000u64));
        assert_eq!(document.get("vehicle").unwrap()["vehicle"]["id"], json!("car-7"));
        assert_eq!(document.timestamp(), Some("2024-09-16T15:20:00Z"));
    }

    #[test]
    fn test_hash_excludes_derived_fields() {
        let e = entity("1", Some(38.9), Some(-77.0), Some(1));
        let document = transform_entity(&e).unwrap();

        let expected = content_hash(&serde_json::to_value(&e).unwrap()).unwrap();
        assert_eq!(document.hash(), expected);
    }

    #[test]
    fn test_same_content_same_hash() {
        let a = transform_entity(&entity("1", Some(38.9), Some(-77.0), Some(1))).unwrap();
        let b = transform_entity(&entity("1", Some(38.9), Some(-77.0), Some(1))).unwrap();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_three_entities_two_with_coordinates() {
        let message = FeedMessage {
            header: None,
            entity: vec![
                entity("1", Some(38.9), Some(-77.0), Some(1)),
                entity("2", None, None, Some(2)),
                entity("3", Some(38.8), Some(-77.1), Some(3)),
            ],
        };

        let output = transform(&message, MalformedRecordPolicy::Skip).unwrap();

        assert_eq!(output.documents.len(), 3);
        assert_eq!(
            output
                .documents
                .iter()
                .filter(|d| d.location().is_some())
                .count(),
            2
        );
        let ids: Vec<_> = output.documents.iter().map(|d| d.get("id").cloned()).collect();
        assert_eq!(ids, vec![Some(json!("1")), Some(json!("2")), Some(json!("3"))]);

        let mut hashes: Vec<&str> = output.documents.iter().map(Document::hash).collect();
        hashes.sort_unstable();
        hashes.dedup();
        assert_eq!(hashes.len(), 3);
    }

    #[test]
    fn test_missing_vehicle_is_malformed() {
        let e = FeedEntity {
            id: Some("9".to_string()),
            is_deleted: None,
            vehicle: None,
        };

        match transform_entity(&e) {
            Err(RailposError::MalformedRecord(record)) => assert_eq!(record.entity_id, "9"),
            other => panic!("Expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_timestamp_is_malformed() {
        let err = transform_entity(&entity("1", Some(38.9), Some(-77.0), None)).unwrap_err();
        assert!(matches!(err, RailposError::MalformedRecord(_)));
    }

    #[test]
    fn test_out_of_range_timestamp_is_malformed() {
        let err = transform_entity(&entity("1", None, None, Some(u64::MAX))).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_year_ten_thousand_timestamp_is_malformed() {
        let err =
            transform_entity(&entity("1", None, None, Some(253_402_300_800))).unwrap_err();
        assert!(matches!(err, RailposError::MalformedRecord(_)));
    }

    #[test]
    fn test_skip_policy_drops_malformed_entities() {
        let message = FeedMessage {
            header: None,
            entity: vec![
                entity("1", None, None, Some(1)),
                entity("2", None, None, None),
                entity("3", None, None, Some(3)),
            ],
        };

        let output = transform(&message, MalformedRecordPolicy::Skip).unwrap();

        assert_eq!(output.documents.len(), 2);
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].entity_id, "2");
    }

    #[test]
    fn test_abort_policy_fails_the_batch() {
        let message = FeedMessage {
            header: None,
            entity: vec![entity("1", None, None, Some(1)), entity("2", None, None, None)],
        };

        let err = transform(&message, MalformedRecordPolicy::Abort).unwrap_err();
        assert!(matches!(err, RailposError::MalformedRecord(_)));
    }

    #[test]
    fn test_empty_message() {
        let output = transform(&FeedMessage::default(), MalformedRecordPolicy::Abort).unwrap();
        assert!(output.documents.is_empty());
        assert!(output.skipped.is_empty());
    }
}
