//! Pick the map features worth mentioning and describe them.
//!
//! Only `way` elements with tags and a resolvable name are considered. A
//! description is built from the tags in increasing priority:
//!
//! 1. generally interesting categories (`"tourism: museum"`)
//! 2. specifically interesting values (`"lighthouse"`)
//! 3. airports and bus stops
//! 4. populated places
//! 5. administrative boundaries
//!
//! Later rules overwrite earlier ones. Features with no description are
//! dropped. See <https://wiki.openstreetmap.org/wiki/Map_features>.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Interest, MapFeature, TrailPoint};

/// Tag categories where any value is interesting.
pub const GENERALLY_INTERESTING: [&str; 5] = ["geological", "tourism", "amenity", "water", "place"];

/// Tag categories where only some values are interesting.
pub const SPECIFICALLY_INTERESTING: [(&str, &[&str]); 4] = [
    ("leisure", &["park", "stadium"]),
    (
        "man_made",
        &["bridge", "communications_tower", "lighthouse", "offshore_platform"],
    ),
    ("historic", &["archaeological_site"]),
    ("natural", &["peninsula", "bay", "reef", "glacier", "peak"]),
];

/// Options for feature classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Ignore `amenity` tags while the aircraft is above `altitude_threshold`
    pub filter_by_altitude: bool,
    /// Default: 400.0 (provider altitude units)
    pub altitude_threshold: f64,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            filter_by_altitude: false,
            altitude_threshold: 400.0,
        }
    }
}

/// Display name by tag priority: `name:en`, `name:fr`, `name`, then the
/// provider's own name field.
pub fn best_name(feature: &MapFeature) -> Option<String> {
    feature
        .tag("name:en")
        .or_else(|| feature.tag("name:fr"))
        .or_else(|| feature.tag("name"))
        .or_else(|| feature.name.as_deref().filter(|n| !n.is_empty()))
        .map(str::to_string)
}

/// Describe a single feature, or `None` if it is not interesting.
pub fn classify_feature(feature: &MapFeature, waypoint: &TrailPoint, options: &FilterOptions) -> Option<Interest> {
    if feature.kind != "way" || !feature.has_tags() {
        return None;
    }
    let name = best_name(feature)?;

    let mut description: Option<String> = None;

    for category in GENERALLY_INTERESTING {
        if category == "amenity" && options.filter_by_altitude && waypoint.altitude > options.altitude_threshold {
            continue;
        }
        if let Some(value) = feature.tag(category) {
            description = Some(format!("{}: {}", category, value));
        }
    }

    for (category, allowed) in SPECIFICALLY_INTERESTING {
        if let Some(value) = feature.tag(category) {
            if allowed.contains(&value) {
                description = Some(value.to_string());
            }
        }
    }

    if feature.tag("aeroway") == Some("aerodrome") {
        description = Some(labelled("Airport.", feature.tag("note")));
    } else if feature.tag("highway") == Some("bus_stop") {
        description = Some(labelled("Bus stop.", feature.tag("shelter")));
    }

    if let Some(population) = feature.tag("population") {
        description = Some(format!("pop. {}", population));
    }

    if feature.tag("boundary") == Some("administrative") {
        description = Some(format!(
            "Edge of {}. pop. {}",
            name,
            feature.tag("population").unwrap_or("n/a")
        ));
    }

    description.map(|description| Interest {
        id: feature.id,
        name,
        description,
        debug: debug_line(feature),
    })
}

fn labelled(label: &str, detail: Option<&str>) -> String {
    match detail {
        Some(d) => format!("{} {}", label, d),
        None => label.to_string(),
    }
}

/// Tag dump followed by the raw feature JSON.
fn debug_line(feature: &MapFeature) -> String {
    let tag_list: String = feature
        .tags
        .iter()
        .flatten()
        .map(|(k, v)| format!(", {}:{}  ", k, v))
        .collect();
    let raw = serde_json::to_string(feature).unwrap_or_default();
    format!("({}) >> {} << {{}} ", tag_list, raw)
}

/// Feature filter for one report run.
///
/// Remembers every feature id it has reported, so a feature seen from
/// several waypoints is only listed under the first one processed. Create a
/// new filter for each run.
#[derive(Debug, Default)]
pub struct FeatureFilter {
    options: FilterOptions,
    seen: HashSet<u64>,
}

impl FeatureFilter {
    pub fn new(options: FilterOptions) -> Self {
        Self {
            options,
            seen: HashSet::new(),
        }
    }

    /// Interesting, not yet reported features around `waypoint`, in input order.
    pub fn interests_for(&mut self, features: &[MapFeature], waypoint: &TrailPoint) -> Vec<Interest> {
        let interests: Vec<Interest> = features
            .iter()
            .filter_map(|f| classify_feature(f, waypoint, &self.options))
            .filter(|interest| self.seen.insert(interest.id))
            .collect();

        debug!(
            "[FeatureFilter] {} features -> {} interests ({} seen this run)",
            features.len(),
            interests.len(),
            self.seen.len()
        );
        interests
    }

    /// Number of distinct features reported so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn way(id: u64, tags: serde_json::Value) -> MapFeature {
        serde_json::from_value(json!({"type": "way", "id": id, "nodes": [1, 2, 3], "tags": tags})).unwrap()
    }

    fn at_altitude(altitude: f64) -> TrailPoint {
        TrailPoint::new(0.0, 0.0, 0).with_motion(200.0, altitude)
    }

    fn describe(feature: &MapFeature) -> Option<String> {
        classify_feature(feature, &at_altitude(0.0), &FilterOptions::default()).map(|i| i.description)
    }

    #[test]
    fn test_best_name_priority() {
        let all = way(1, json!({"name:en": "Lake Geneva", "name:fr": "Lac Léman", "name": "Léman"}));
        assert_eq!(best_name(&all).as_deref(), Some("Lake Geneva"));

        let french = way(2, json!({"name:fr": "Lac Léman", "name": "Léman"}));
        assert_eq!(best_name(&french).as_deref(), Some("Lac Léman"));

        let mut bare = way(3, json!({"water": "lake"}));
        assert_eq!(best_name(&bare), None);
        bare.name = Some("Provider name".to_string());
        assert_eq!(best_name(&bare).as_deref(), Some("Provider name"));
    }

    #[test]
    fn test_only_named_tagged_ways() {
        let node: MapFeature =
            serde_json::from_value(json!({"type": "node", "id": 1, "tags": {"name": "X", "tourism": "museum"}})).unwrap();
        assert_eq!(describe(&node), None);

        let unnamed = way(2, json!({"tourism": "museum"}));
        assert_eq!(describe(&unnamed), None);

        let untagged: MapFeature = serde_json::from_value(json!({"type": "way", "id": 3, "name": "X"})).unwrap();
        assert_eq!(describe(&untagged), None);

        let boring = way(4, json!({"name": "Some Road", "highway": "residential"}));
        assert_eq!(describe(&boring), None);
    }

    #[test]
    fn test_general_categories_later_wins() {
        let feature = way(1, json!({"name": "Museum Pond", "tourism": "museum", "water": "pond"}));
        assert_eq!(describe(&feature).as_deref(), Some("water: pond"));
    }

    #[test]
    fn test_specific_values() {
        let lighthouse = way(1, json!({"name": "Beachy Head", "man_made": "lighthouse", "tourism": "attraction"}));
        assert_eq!(describe(&lighthouse).as_deref(), Some("lighthouse"));

        let pier = way(2, json!({"name": "Pier", "man_made": "pier"}));
        assert_eq!(describe(&pier), None);
    }

    #[test]
    fn test_special_overrides() {
        let airport = way(1, json!({"name": "Heathrow", "aeroway": "aerodrome", "note": "LHR", "amenity": "x"}));
        assert_eq!(describe(&airport).as_deref(), Some("Airport. LHR"));

        let bus = way(2, json!({"name": "Stop", "highway": "bus_stop", "shelter": "yes"}));
        assert_eq!(describe(&bus).as_deref(), Some("Bus stop. yes"));

        let bare_bus = way(3, json!({"name": "Stop", "highway": "bus_stop"}));
        assert_eq!(describe(&bare_bus).as_deref(), Some("Bus stop."));

        let town = way(4, json!({"name": "Reading", "place": "town", "population": "174224"}));
        assert_eq!(describe(&town).as_deref(), Some("pop. 174224"));

        let border = way(5, json!({"name:en": "Surrey", "boundary": "administrative", "population": "1200000"}));
        assert_eq!(describe(&border).as_deref(), Some("Edge of Surrey. pop. 1200000"));

        let unknown = way(6, json!({"name": "Parish", "boundary": "administrative"}));
        assert_eq!(describe(&unknown).as_deref(), Some("Edge of Parish. pop. n/a"));
    }

    #[test]
    fn test_altitude_filter_skips_amenity() {
        let cafe = way(1, json!({"name": "Cafe", "amenity": "cafe"}));
        let options = FilterOptions {
            filter_by_altitude: true,
            ..FilterOptions::default()
        };

        assert!(classify_feature(&cafe, &at_altitude(35_000.0), &options).is_none());
        assert!(classify_feature(&cafe, &at_altitude(300.0), &options).is_some());
        assert!(classify_feature(&cafe, &at_altitude(35_000.0), &FilterOptions::default()).is_some());
    }

    #[test]
    fn test_debug_line() {
        let feature = way(9, json!({"name": "A", "tourism": "zoo"}));
        let interest = classify_feature(&feature, &at_altitude(0.0), &FilterOptions::default()).unwrap();
        assert!(interest.debug.starts_with("(, name:A  , tourism:zoo  ) >> {"));
        assert!(interest.debug.ends_with(" << {} "));
        assert_eq!(interest.id, 9);
        assert_eq!(interest.name, "A");
    }

    #[test]
    fn test_dedupe_across_waypoints() {
        let shared = way(1, json!({"name": "Lake", "water": "lake"}));
        let other = way(2, json!({"name": "Park", "leisure": "park"}));
        let a = at_altitude(0.0);
        let b = at_altitude(0.0);

        let mut filter = FeatureFilter::new(FilterOptions::default());
        let first = filter.interests_for(&[shared.clone()], &a);
        let second = filter.interests_for(&[other.clone(), shared.clone()], &b);

        assert_eq!(first.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(second.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(filter.seen_count(), 2);
    }

    #[test]
    fn test_fresh_filter_is_repeatable() {
        let features = vec![
            way(1, json!({"name": "Lake", "water": "lake"})),
            way(2, json!({"name": "Road", "highway": "primary"})),
            way(3, json!({"name": "Peak", "natural": "peak"})),
        ];
        let point = at_altitude(1000.0);

        let run = || FeatureFilter::new(FilterOptions::default()).interests_for(&features, &point);
        let first = run();
        assert_eq!(first, run());
        assert_eq!(first.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 3]);
    }
}
