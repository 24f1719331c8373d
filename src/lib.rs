//! # Flight Spy
//!
//! Turn a recorded flight trail into a chronological list of the things that
//! could be seen from the aircraft.
//!
//! This library provides:
//! - Trail reduction to a sparse set of waypoints (distance and/or time gaps)
//! - A disk-backed, content-addressed blob cache for provider responses
//! - Rate-limited, concurrent map enrichment that skips throttling on cache hits
//! - Tag-based filtering of OpenStreetMap features into human-readable interests
//! - A plain-text report with optional name translation
//!
//! ## Features
//!
//! - **`http`** - Enable reqwest clients for Flightradar24, OpenStreetMap and LibreTranslate
//! - **`cli`** - Build the `flight-spy` binary
//!
//! ## Quick Start
//!
//! ```rust
//! use flight_spy::{reduce_trail, ReduceConfig, TrailPoint};
//!
//! let trail = vec![
//!     TrailPoint::new(0.0, 0.0, 1_000),
//!     TrailPoint::new(0.0, 0.001, 1_060),
//!     TrailPoint::new(0.0, 0.01, 1_120),
//! ];
//!
//! let waypoints = reduce_trail(&trail, &ReduceConfig::by_distance(500.0));
//! assert_eq!(waypoints.len(), 2);
//! assert_eq!(waypoints[1].longitude, 0.01);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod geo_utils;
pub mod providers;
pub mod reducer;
pub mod report;
pub mod translate;

// HTTP module for the concrete providers
#[cfg(feature = "http")]
pub mod http;

pub use cache::{BlobCache, CacheKey, CacheParam};
pub use config::SpyConfig;
pub use enrich::{enrich_trail, EnrichConfig, FailurePolicy, WaypointFeatures};
pub use error::{Result, SpyError};
pub use filter::{classify_feature, FeatureFilter, FilterOptions};
pub use providers::{FlightCache, FlightProvider, MapCache, MapProvider};
pub use reducer::{reduce_trail, ReduceConfig};
pub use report::{Report, ReportEntry, ShownInterest};
pub use translate::{NoTranslation, Translator};

#[cfg(feature = "http")]
pub use http::{Flightradar24Client, LibreTranslate, OsmClient};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use flight_spy::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A single sample of a flight trail.
///
/// Provider fields accept both the long names and the short Flightradar24
/// names (`lat`, `lng`, `ts`, `spd`, `alt`). The optional fields are filled in
/// by the reducer (`bearing`, `delta`) and when timestamps are humanized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
    /// Unix epoch seconds
    #[serde(alias = "ts")]
    pub timestamp: i64,
    /// Ground speed as reported by the provider (knots for Flightradar24)
    #[serde(alias = "spd", default)]
    pub speed: f64,
    /// Altitude as reported by the provider (feet for Flightradar24)
    #[serde(alias = "alt", default)]
    pub altitude: f64,
    /// Initial bearing in degrees from the previously emitted waypoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    /// Seconds since the previously emitted time-gap waypoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_time: Option<String>,
}

impl TrailPoint {
    /// Create a trail point with zero speed and altitude.
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            speed: 0.0,
            altitude: 0.0,
            bearing: None,
            delta: None,
            human_time: None,
        }
    }

    /// Set speed and altitude.
    pub fn with_motion(mut self, speed: f64, altitude: f64) -> Self {
        self.speed = speed;
        self.altitude = altitude;
        self
    }

    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Axis-aligned lat/lng box around a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat0: f64,
    pub lng0: f64,
    pub lat1: f64,
    pub lng1: f64,
}

/// A flight as returned by the trail provider.
///
/// The trail is kept in provider order (newest first); use
/// [`FlightRecord::chronological_trail`] before reducing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    #[serde(default)]
    pub trail: Vec<TrailPoint>,
    /// Everything else the provider sent (identification, aircraft, airports...)
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl FlightRecord {
    /// The trail in ascending time order.
    pub fn chronological_trail(&self) -> Vec<TrailPoint> {
        self.trail.iter().rev().cloned().collect()
    }
}

/// A raw map element (node, way or relation) from the map provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFeature {
    pub id: u64,
    /// Element type: `node`, `way` or `relation`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    /// Provider-supplied display name, used when no name tag is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Geometry and metadata fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapFeature {
    /// Non-empty value of a tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()
            .and_then(|tags| tags.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn has_tags(&self) -> bool {
        self.tags.as_ref().map_or(false, |tags| !tags.is_empty())
    }
}

/// A map feature judged worth mentioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub debug: String,
}

/// A waypoint with the interests found around it, in feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedWaypoint {
    pub waypoint: TrailPoint,
    pub interests: Vec<Interest>,
}

// ============================================================================
// Unit Tests
// ============================================================================
