//! Trail reduction: pick a sparse, ordered set of waypoints from a dense trail.
//!
//! The reducer walks a chronological trail once and emits a point whenever one
//! of the configured gaps is exceeded:
//!
//! - **distance**: great-circle distance from the last distance-emitted
//!   position is over the gap, or over half the gap while the aircraft is
//!   moving faster than [`HIGH_SPEED`]
//! - **time**: the point's timestamp is at least the gap away from the last
//!   time-emitted timestamp (initially 0)
//!
//! The two rules are independent: a point selected by both appears twice.
//! The first point always opens the result and the last point always closes
//! it; the closing append is skipped only when the walk already ended on that
//! very point.

use log::debug;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::geo_utils::{calculate_bearing, haversine_distance};
use crate::TrailPoint;

/// Speed above which the distance gap is halved.
pub const HIGH_SPEED: f64 = 200.0;

/// Which gap rules are active. With neither set the result is just the
/// first and last points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReduceConfig {
    /// Distance gap in meters
    pub by_distance: Option<f64>,
    /// Time gap in seconds
    pub by_time: Option<i64>,
}

impl ReduceConfig {
    pub fn by_distance(meters: f64) -> Self {
        Self {
            by_distance: Some(meters),
            by_time: None,
        }
    }

    pub fn by_time(seconds: i64) -> Self {
        Self {
            by_distance: None,
            by_time: Some(seconds),
        }
    }

    /// Also enable the time rule.
    pub fn with_time(mut self, seconds: i64) -> Self {
        self.by_time = Some(seconds);
        self
    }
}

/// Reduce a chronological trail to waypoints.
///
/// Returns an empty vector for trails with fewer than two points. Otherwise
/// the result starts with `trail[0]`, ends with the last point, and keeps
/// source order. Emitted points carry `bearing` (distance rule) and/or
/// `delta` (time rule); every returned point has `human_time` set.
///
/// # Example
/// ```
/// use flight_spy::{reduce_trail, ReduceConfig, TrailPoint};
///
/// let trail: Vec<TrailPoint> = (0..10)
///     .map(|i| TrailPoint::new(0.0, i as f64 * 0.01, 1_000 + i * 60))
///     .collect();
///
/// // ~1.1km between samples, 2km gap: every other sample
/// let waypoints = reduce_trail(&trail, &ReduceConfig::by_distance(2_000.0));
/// assert_eq!(waypoints.first().unwrap().timestamp, 1_000);
/// assert_eq!(waypoints.last().unwrap().timestamp, 1_540);
/// ```
pub fn reduce_trail(trail: &[TrailPoint], config: &ReduceConfig) -> Vec<TrailPoint> {
    if trail.len() < 2 {
        return Vec::new();
    }

    let mut results = vec![trail[0].clone()];
    // Source index of the most recent output element
    let mut last_index = 0;

    let mut last_position = trail[0].position();
    let mut last_time: i64 = 0;

    for (index, point) in trail.iter().enumerate() {
        let mut candidate = point.clone();
        let mut emitted = 0;

        if let Some(gap) = config.by_distance {
            let position = point.position();
            let distance = haversine_distance(&last_position, &position);

            if distance > gap || (point.speed > HIGH_SPEED && distance > gap / 2.0) {
                candidate.bearing = Some(calculate_bearing(&last_position, &position));
                last_position = position;
                emitted += 1;
            }
        }

        if let Some(gap) = config.by_time {
            let delta = (point.timestamp - last_time).abs();

            if delta >= gap {
                candidate.delta = Some(delta);
                last_time = point.timestamp;
                emitted += 1;
            }
        }

        // One copy per rule, each carrying every annotation
        if emitted > 0 {
            results.extend(std::iter::repeat(candidate).take(emitted));
            last_index = index;
        }
    }

    let final_index = trail.len() - 1;
    if last_index != final_index {
        results.push(trail[final_index].clone());
    }

    for point in &mut results {
        point.human_time = Some(human_timestamp(point.timestamp));
    }

    debug!(
        "[reduce_trail] {} points -> {} waypoints ({:?})",
        trail.len(),
        results.len(),
        config
    );

    results
}

/// Format epoch seconds as `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn human_timestamp(epoch_seconds: i64) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(epoch_seconds)
        .ok()
        .and_then(|t| t.format(&format).ok())
        .unwrap_or_else(|| epoch_seconds.to_string())
}
