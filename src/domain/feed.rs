//! GTFS-realtime feed messages
//!
//! Rust representations of the subset of the GTFS-realtime `FeedMessage`
//! schema that carries vehicle positions. Decoding uses `prost`; fields the
//! pipeline does not model (trip updates, alerts, extensions) are skipped by
//! the decoder.
//!
//! The same structs serialize through `serde` using the protobuf JSON field
//! names (camelCase, unset fields omitted, enum values by name). That JSON is
//! the content of an indexed document.

use prost::Message;
use serde::{Serialize, Serializer};

/// The decoded payload of one feed fetch.
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct FeedMessage {
    /// Feed-level metadata
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<FeedHeader>,

    /// Entities in arrival order
    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

/// Feed-level metadata.
#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedHeader {
    #[prost(string, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gtfs_realtime_version: Option<String>,

    #[prost(enumeration = "Incrementality", optional, tag = "2")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "incrementality_name"
    )]
    pub incrementality: Option<i32>,

    /// Feed creation time, UNIX seconds
    #[prost(uint64, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// One update within a feed message.
#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntity {
    /// Feed-unique entity identifier
    #[prost(string, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[prost(bool, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,

    /// Vehicle position payload
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehiclePosition>,
}

/// Realtime positioning information for a given vehicle.
#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePosition {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip: Option<TripDescriptor>,

    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    #[prost(uint32, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stop_sequence: Option<u32>,

    #[prost(enumeration = "VehicleStopStatus", optional, tag = "4")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "stop_status_name"
    )]
    pub current_status: Option<i32>,

    /// Moment at which the position was measured, UNIX seconds
    #[prost(uint64, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,

    #[prost(enumeration = "CongestionLevel", optional, tag = "6")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "congestion_level_name"
    )]
    pub congestion_level: Option<i32>,

    #[prost(string, optional, tag = "7")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,

    #[prost(message, optional, tag = "8")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehicleDescriptor>,

    #[prost(enumeration = "OccupancyStatus", optional, tag = "9")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "occupancy_status_name"
    )]
    pub occupancy_status: Option<i32>,

    #[prost(uint32, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_percentage: Option<u32>,
}

/// A geographic position of a vehicle.
///
/// Latitude and longitude are `required` in the published schema but are
/// modelled as optional here so an absent coordinate is distinguishable from
/// a zero one.
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct Position {
    /// Degrees North, WGS-84
    #[prost(float, optional, tag = "1")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "shortest_float"
    )]
    pub latitude: Option<f32>,

    /// Degrees East, WGS-84
    #[prost(float, optional, tag = "2")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "shortest_float"
    )]
    pub longitude: Option<f32>,

    #[prost(float, optional, tag = "3")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "shortest_float"
    )]
    pub bearing: Option<f32>,

    #[prost(double, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odometer: Option<f64>,

    /// Meters per second
    #[prost(float, optional, tag = "5")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "shortest_float"
    )]
    pub speed: Option<f32>,
}

/// Identifies the trip a vehicle is serving.
#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDescriptor {
    #[prost(string, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,

    #[prost(string, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[prost(string, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    #[prost(enumeration = "ScheduleRelationship", optional, tag = "4")]
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "schedule_relationship_name"
    )]
    pub schedule_relationship: Option<i32>,

    #[prost(string, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,

    #[prost(uint32, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction_id: Option<u32>,
}

/// Identification information for the vehicle performing the trip.
#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDescriptor {
    #[prost(string, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[prost(string, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[prost(string, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
}

/// Protobuf enum names as they appear in the JSON mapping.
pub trait ProtoEnumName: Sized + TryFrom<i32> {
    /// The upper-snake-case value name from the schema
    fn as_str_name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Incrementality {
    FullDataset = 0,
    Differential = 1,
}

impl ProtoEnumName for Incrementality {
    fn as_str_name(&self) -> &'static str {
        match self {
            Self::FullDataset => "FULL_DATASET",
            Self::Differential => "DIFFERENTIAL",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum VehicleStopStatus {
    /// The vehicle is just about to arrive at the stop
    IncomingAt = 0,
    /// The vehicle is standing at the stop
    StoppedAt = 1,
    /// The vehicle has departed the previous stop and is in transit
    InTransitTo = 2,
}

impl ProtoEnumName for VehicleStopStatus {
    fn as_str_name(&self) -> &'static str {
        match self {
            Self::IncomingAt => "INCOMING_AT",
            Self::StoppedAt => "STOPPED_AT",
            Self::InTransitTo => "IN_TRANSIT_TO",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum CongestionLevel {
    UnknownCongestionLevel = 0,
    RunningSmoothly = 1,
    StopAndGo = 2,
    Congestion = 3,
    SevereCongestion = 4,
}

impl ProtoEnumName for CongestionLevel {
    fn as_str_name(&self) -> &'static str {
        match self {
            Self::UnknownCongestionLevel => "UNKNOWN_CONGESTION_LEVEL",
            Self::RunningSmoothly => "RUNNING_SMOOTHLY",
            Self::StopAndGo => "STOP_AND_GO",
            Self::Congestion => "CONGESTION",
            Self::SevereCongestion => "SEVERE_CONGESTION",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OccupancyStatus {
    Empty = 0,
    ManySeatsAvailable = 1,
    FewSeatsAvailable = 2,
    StandingRoomOnly = 3,
    CrushedStandingRoomOnly = 4,
    Full = 5,
    NotAcceptingPassengers = 6,
    NoDataAvailable = 7,
    NotBoardable = 8,
}

impl ProtoEnumName for OccupancyStatus {
    fn as_str_name(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::ManySeatsAvailable => "MANY_SEATS_AVAILABLE",
            Self::FewSeatsAvailable => "FEW_SEATS_AVAILABLE",
            Self::StandingRoomOnly => "STANDING_ROOM_ONLY",
            Self::CrushedStandingRoomOnly => "CRUSHED_STANDING_ROOM_ONLY",
            Self::Full => "FULL",
            Self::NotAcceptingPassengers => "NOT_ACCEPTING_PASSENGERS",
            Self::NoDataAvailable => "NO_DATA_AVAILABLE",
            Self::NotBoardable => "NOT_BOARDABLE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ScheduleRelationship {
    Scheduled = 0,
    Added = 1,
    Unscheduled = 2,
    Canceled = 3,
    Replacement = 5,
    Duplicated = 6,
    Deleted = 7,
}

impl ProtoEnumName for ScheduleRelationship {
    fn as_str_name(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Added => "ADDED",
            Self::Unscheduled => "UNSCHEDULED",
            Self::Canceled => "CANCELED",
            Self::Replacement => "REPLACEMENT",
            Self::Duplicated => "DUPLICATED",
            Self::Deleted => "DELETED",
        }
    }
}

/// Converts a decoded `float` to the shortest `f64` that prints the same.
///
/// Widening an `f32` directly exposes binary noise (`38.8951` becomes
/// `38.895099639892578`).
pub fn shortest_f64(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(value as f64)
}

fn shortest_float<S: Serializer>(value: &Option<f32>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_f64(shortest_f64(*v)),
        None => serializer.serialize_none(),
    }
}

// Unknown values fall back to the integer, as the protobuf JSON mapping does.
fn enum_name<E: ProtoEnumName, S: Serializer>(
    value: &Option<i32>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => match E::try_from(*v) {
            Ok(known) => serializer.serialize_str(known.as_str_name()),
            Err(_) => serializer.serialize_i32(*v),
        },
        None => serializer.serialize_none(),
    }
}

fn incrementality_name<S: Serializer>(v: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    enum_name::<Incrementality, S>(v, s)
}

fn stop_status_name<S: Serializer>(v: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    enum_name::<VehicleStopStatus, S>(v, s)
}

fn congestion_level_name<S: Serializer>(v: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    enum_name::<CongestionLevel, S>(v, s)
}

fn occupancy_status_name<S: Serializer>(v: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    enum_name::<OccupancyStatus, S>(v, s)
}

fn schedule_relationship_name<S: Serializer>(v: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    enum_name::<ScheduleRelationship, S>(v, s)
}
