//! Run configuration.
//!
//! Every knob has a default, so an empty file (or no file at all) is a valid
//! configuration. Files are YAML:
//!
//! ```yaml
//! flight_id: 36e9026e
//! distance_gap_m: 50000
//! time_gap_s: ~
//! map_area_radius_m: 1500
//! rate_limit_ms: 1000
//! filter_by_altitude: false
//! failure_policy: skip
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::enrich::{EnrichConfig, FailurePolicy};
use crate::error::Result;
use crate::filter::FilterOptions;
use crate::reducer::ReduceConfig;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".flightspy.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpyConfig {
    /// Flightradar24 flight id
    pub flight_id: String,
    /// Root of the on-disk response cache
    pub cache_root: PathBuf,
    /// Minimum spacing between map requests, in milliseconds
    pub rate_limit_ms: u64,
    /// Distance gap for trail reduction, in meters
    pub distance_gap_m: Option<f64>,
    /// Time gap for trail reduction, in seconds
    pub time_gap_s: Option<i64>,
    /// Edge length of the box searched around each waypoint, in meters
    pub map_area_radius_m: f64,
    pub filter_by_altitude: bool,
    pub altitude_threshold: f64,
    pub failure_policy: FailurePolicy,
    /// LibreTranslate endpoint; `None` disables translation
    pub translate_url: Option<String>,
    pub target_language: String,
}

impl Default for SpyConfig {
    fn default() -> Self {
        Self {
            flight_id: "36e9026e".to_string(),
            cache_root: PathBuf::from("flightcache"),
            rate_limit_ms: 1000,
            distance_gap_m: Some(50_000.0),
            time_gap_s: None,
            map_area_radius_m: 1500.0,
            filter_by_altitude: false,
            altitude_threshold: FilterOptions::default().altitude_threshold,
            failure_policy: FailurePolicy::Abort,
            translate_url: Some("http://localhost:5000/translate".to_string()),
            target_language: "en".to_string(),
        }
    }
}

impl SpyConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // A document with no content deserializes as null
        let blank = yaml
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#'));
        if blank {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load the explicit file if given (it must exist), otherwise
    /// [`DEFAULT_CONFIG_FILE`] if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let yaml = fs::read_to_string(path)?;
            info!("Loaded config from {}", path.display());
            return Self::from_yaml(&yaml);
        }

        match fs::read_to_string(DEFAULT_CONFIG_FILE) {
            Ok(yaml) => {
                info!("Loaded config from {}", DEFAULT_CONFIG_FILE);
                Self::from_yaml(&yaml)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn reduce_config(&self) -> ReduceConfig {
        ReduceConfig {
            by_distance: self.distance_gap_m,
            by_time: self.time_gap_s,
        }
    }

    pub fn enrich_config(&self) -> EnrichConfig {
        EnrichConfig {
            area_size_m: self.map_area_radius_m,
            spacing_ms: self.rate_limit_ms,
            failure_policy: self.failure_policy,
        }
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            filter_by_altitude: self.filter_by_altitude,
            altitude_threshold: self.altitude_threshold,
        }
    }

    /// `<cache_root>/<flight_id>`
    pub fn flight_cache_dir(&self) -> PathBuf {
        self.cache_root.join(&self.flight_id)
    }

    /// `<cache_root>/<flight_id>/map`
    pub fn map_cache_dir(&self) -> PathBuf {
        self.flight_cache_dir().join("map")
    }
}
