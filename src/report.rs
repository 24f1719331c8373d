//! Chronological text report of the interests along a trail.
//!
//! [`Report`] pairs every waypoint with its (already filtered and
//! de-duplicated) interests, runs names through a [`Translator`] and renders
//! one block per waypoint that has something to show:
//!
//! ```text
//! 2023-11-14 22:13:20 := Heathrow - Airport. LHR
//! t + 0 seconds          Staines Reservoirs - water: reservoir
//! (speed=160)
//! (altitude=1200)
//! ```

use futures::future::join_all;
use log::debug;

use crate::enrich::WaypointFeatures;
use crate::filter::FeatureFilter;
use crate::geo_utils::seconds_as_human;
use crate::reducer::human_timestamp;
use crate::translate::{decorate_name, Translator};
use crate::{EnrichedWaypoint, TrailPoint};

/// One line of a report entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownInterest {
    pub name: String,
    pub description: String,
}

/// A waypoint and the interests to print next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub waypoint: TrailPoint,
    pub show: Vec<ShownInterest>,
}

/// Report over enriched waypoints, in trail order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    entries: Vec<EnrichedWaypoint>,
}

impl Report {
    pub fn new(entries: Vec<EnrichedWaypoint>) -> Self {
        Self { entries }
    }

    /// Filter each waypoint's raw features through `filter`, in order.
    pub fn from_features(features: Vec<WaypointFeatures>, filter: &mut FeatureFilter) -> Self {
        let entries = features
            .into_iter()
            .map(|wf| {
                let interests = filter.interests_for(&wf.features, &wf.waypoint);
                EnrichedWaypoint {
                    waypoint: wf.waypoint,
                    interests,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[EnrichedWaypoint] {
        &self.entries
    }

    /// Timestamp of the first waypoint, or 0 for an empty report.
    pub fn start_time(&self) -> i64 {
        self.entries.first().map_or(0, |e| e.waypoint.timestamp)
    }

    /// Translate names and build printable entries, one per waypoint.
    pub async fn process<T: Translator>(&self, translator: &T, target_language: &str) -> Vec<ReportEntry> {
        let entries = self.entries.iter().map(|entry| async move {
            let shown = entry.interests.iter().map(|interest| async move {
                let translated = translator.translate(&interest.name, target_language).await;
                ShownInterest {
                    name: decorate_name(&interest.name, &translated),
                    description: interest.description.clone(),
                }
            });

            ReportEntry {
                waypoint: entry.waypoint.clone(),
                show: join_all(shown).await,
            }
        });

        let processed = join_all(entries).await;
        debug!(
            "[Report] {} entries, {} with interests",
            processed.len(),
            processed.iter().filter(|e| !e.show.is_empty()).count()
        );
        processed
    }
}

/// Render all entries with something to show.
pub fn render(entries: &[ReportEntry], start_time: i64) -> String {
    entries.iter().map(|e| render_entry(e, start_time)).collect()
}

/// Render one entry; empty string when it has nothing to show.
pub fn render_entry(entry: &ReportEntry, start_time: i64) -> String {
    if entry.show.is_empty() {
        return String::new();
    }

    let pos = &entry.waypoint;
    let time = pos
        .human_time
        .clone()
        .unwrap_or_else(|| human_timestamp(pos.timestamp));

    let time_heading = format!("{} := ", time);
    let width = time_heading.chars().count();

    let headings: Vec<String> = [
        time_heading,
        format!("t + {}", seconds_as_human(pos.timestamp - start_time)),
        format!("(speed={})", format_number(pos.speed)),
        format!("(altitude={})", format_number(pos.altitude)),
    ]
    .iter()
    .map(|h| fit(h, width))
    .collect();
    let blank = " ".repeat(width);

    let mut out = String::new();
    for (idx, show) in entry.show.iter().enumerate() {
        let lhs = headings.get(idx).unwrap_or(&blank);
        out.push_str(&format!("{}{} - {}\n", lhs, show.name, show.description));
    }
    for heading in headings.iter().skip(entry.show.len()) {
        out.push_str(heading);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Pad with spaces or truncate to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let mut fitted: String = text.chars().take(width).collect();
    let len = fitted.chars().count();
    fitted.extend(std::iter::repeat(' ').take(width - len));
    fitted
}

/// Whole numbers without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
