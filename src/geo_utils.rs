//! # Geographic Utilities
//!
//! Small geographic and timing helpers used by the reducer, the enrichment
//! stage and the report.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`calculate_bearing`] | Initial bearing from one point towards another |
//! | [`surround_area`] | Bounding box of a given size centred on a point |
//! | [`seconds_as_human`] | Render a duration as "1 hr 5 mins" style text |
//! | [`delay`] | Async sleep in milliseconds |
//!
//! ## Example
//!
//! ```rust
//! use flight_spy::{GpsPoint, geo_utils};
//!
//! let heathrow = GpsPoint::new(51.4700, -0.4543);
//! let gatwick = GpsPoint::new(51.1537, -0.1821);
//!
//! let dist = geo_utils::haversine_distance(&heathrow, &gatwick);
//! println!("{:.0}m on a bearing of {:.0}", dist, geo_utils::calculate_bearing(&heathrow, &gatwick));
//!
//! let area = geo_utils::surround_area(51.47, -0.4543, 1500.0);
//! assert!(area.lat0 < 51.47 && area.lat1 > 51.47);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula from the `geo` crate (spherical Earth,
//! radius 6,371 km). The surround area uses a flat-Earth offset with an
//! equatorial radius of 6,378 km, which is accurate enough for boxes of a few
//! kilometres away from the poles.
//!
//! Reference: <https://www.movable-type.co.uk/scripts/latlong.html>

use std::time::Duration;

use geo::{Distance, Haversine, Point};

use crate::{BoundingBox, GpsPoint};

/// Equatorial radius used for box offsets, in meters.
const EARTH_RADIUS_M: f64 = 6_378_000.0;

// =============================================================================
// Distance and Bearing
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in meters.
///
/// # Example
///
/// ```rust
/// use flight_spy::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Initial great-circle bearing from `from` towards `to`.
///
/// Returns degrees clockwise from true north, in `[0, 360)`.
///
/// # Example
///
/// ```rust
/// use flight_spy::{GpsPoint, geo_utils};
///
/// let origin = GpsPoint::new(0.0, 0.0);
/// let east = GpsPoint::new(0.0, 1.0);
/// assert!((geo_utils::calculate_bearing(&origin, &east) - 90.0).abs() < 1e-9);
/// ```
pub fn calculate_bearing(from: &GpsPoint, to: &GpsPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();
    let theta = y.atan2(x);

    (theta.to_degrees() + 360.0) % 360.0
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute a box of `size_meters` on each side, centred on the given position.
///
/// The box extends `size_meters / 2` north, south, east and west. Longitude
/// offsets are widened by `1 / cos(latitude)` so the box stays roughly square
/// on the ground.
///
/// # Arguments
///
/// * `latitude` - Centre latitude in degrees
/// * `longitude` - Centre longitude in degrees
/// * `size_meters` - Edge length of the box in meters
///
/// # Returns
///
/// A [`BoundingBox`] with `(lat0, lng0)` the south-west corner and
/// `(lat1, lng1)` the north-east corner.
pub fn surround_area(latitude: f64, longitude: f64, size_meters: f64) -> BoundingBox {
    let half = size_meters / 2.0;
    let dlat = (half / EARTH_RADIUS_M).to_degrees();
    let dlng = (half / EARTH_RADIUS_M).to_degrees() / latitude.to_radians().cos();

    BoundingBox {
        lat0: latitude - dlat,
        lng0: longitude - dlng,
        lat1: latitude + dlat,
        lng1: longitude + dlng,
    }
}

// =============================================================================
// Time Helpers
// =============================================================================

/// Render a number of seconds as short human text.
///
/// Under a minute the seconds are shown as-is; under an hour whole minutes;
/// otherwise hours and remaining minutes.
///
/// ```rust
/// use flight_spy::geo_utils::seconds_as_human;
///
/// assert_eq!(seconds_as_human(42), "42 seconds");
/// assert_eq!(seconds_as_human(600), "10 minutes");
/// assert_eq!(seconds_as_human(3_900), "1 hr 5 mins");
/// ```
pub fn seconds_as_human(seconds: i64) -> String {
    if seconds < 60 {
        return format!("{} seconds", seconds);
    }

    let mut minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        minutes -= hours * 60;
        return format!("{} hr {} mins", hours, minutes);
    }

    format!("{} minutes", minutes)
}

/// Suspend the current task for `ms` milliseconds.
pub async fn delay(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
