//! Flight domain model.
//!
//! A [`FlightRecord`] is a point-in-time snapshot of a single aircraft as
//! reported by the upstream telemetry provider. Records are immutable once
//! constructed and are replaced wholesale on the next successful fetch for
//! the same flight; there is no partial-update merge.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Lifecycle status of a tracked flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Scheduled,
    Boarding,
    Departed,
    InFlight,
    Landing,
    Landed,
    Arrived,
    Delayed,
    Cancelled,
    Diverted,
    #[default]
    Unknown,
}

impl FlightStatus {
    /// Stable uppercase name, matching the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Boarding => "BOARDING",
            Self::Departed => "DEPARTED",
            Self::InFlight => "IN_FLIGHT",
            Self::Landing => "LANDING",
            Self::Landed => "LANDED",
            Self::Arrived => "ARRIVED",
            Self::Delayed => "DELAYED",
            Self::Cancelled => "CANCELLED",
            Self::Diverted => "DIVERTED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Point-in-time snapshot of a single flight.
///
/// Identity is the `flight_id` (the provider's aircraft identifier, e.g. an
/// ICAO24 address); equality and hashing consider that field alone so a
/// fresher snapshot replaces an older one for the same flight.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    /// Provider aircraft identifier (identity of the record).
    pub flight_id: String,
    /// Radio callsign, when broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    /// Commercial flight number alias, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,

    pub latitude: f64,
    pub longitude: f64,
    /// Barometric altitude in metres.
    pub altitude: f64,
    /// Ground speed in m/s.
    pub speed: f64,

    #[serde(default)]
    pub status: FlightStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_airport_icao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_airport_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_airport_icao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_airport_name: Option<String>,

    /// ISO-8601 timestamps as reported by schedule feeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_departure_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_departure_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_arrival_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_arrival_time: Option<String>,

    /// Epoch milliseconds of the fetch that produced this snapshot.
    pub last_updated: i64,
}

impl FlightRecord {
    /// Create a minimal record with the given identity.
    pub fn new(flight_id: impl Into<String>) -> Self {
        Self {
            flight_id: flight_id.into(),
            ..Self::default()
        }
    }

    /// Whether the record carries a usable position.
    ///
    /// The provider reports (0.0, 0.0) as a sentinel for "no position", so
    /// a record at exactly that coordinate pair is treated as positionless.
    pub fn has_position(&self) -> bool {
        !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}

impl PartialEq for FlightRecord {
    fn eq(&self, other: &Self) -> bool {
        self.flight_id == other.flight_id
    }
}

impl Eq for FlightRecord {}

impl Hash for FlightRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flight_id.hash(state);
    }
}
