//! Map enrichment for reduced waypoints, with dispatch rate limiting.
//!
//! For every waypoint a box is drawn around its position and the map cache is
//! consulted. Hits resolve immediately; misses are fetched from the provider,
//! all concurrently, but with request starts spaced out:
//!
//! 1. All cache lookups run concurrently and are collected in waypoint order.
//! 2. A single synchronous pass hands each miss a dispatch slot
//!    (`0, spacing, 2 * spacing, ...`) in waypoint order. Hits take no slot.
//! 3. Every miss sleeps until its slot, then fetches and stores its result.
//!
//! Results are joined, not queued, so output order always matches input
//! order regardless of which fetch finishes first.

use std::time::Instant;

use futures::future::{join_all, try_join_all};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;
use crate::error::Result;
use crate::geo_utils::{delay, surround_area};
use crate::providers::{MapCache, MapProvider};
use crate::{BoundingBox, MapFeature, TrailPoint};

const DEFAULT_SPACING_MS: u64 = 1000;
const DEFAULT_AREA_SIZE_M: f64 = 1500.0;

/// What to do when the provider fails for one waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole batch with the first error
    #[default]
    Abort,
    /// Log and drop the failed waypoint, keep the others
    Skip,
}

/// Configuration for the enrichment stage.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Edge length in meters of the box queried around each waypoint.
    /// Default: 1500.0
    pub area_size_m: f64,
    /// Minimum spacing between provider request starts.
    /// Default: 1000 ms
    pub spacing_ms: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            area_size_m: DEFAULT_AREA_SIZE_M,
            spacing_ms: DEFAULT_SPACING_MS,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// A waypoint paired with the raw features around it.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointFeatures {
    pub waypoint: TrailPoint,
    pub features: Vec<MapFeature>,
}

/// Give each miss its dispatch delay, in submission order.
///
/// `misses[i]` says whether waypoint `i` needs a fetch. Returns the delay in
/// milliseconds for each miss and `None` for hits. The K-th miss gets
/// `(K - 1) * spacing_ms`.
///
/// ```
/// use flight_spy::enrich::assign_slots;
///
/// let slots = assign_slots([true, false, true, true], 1000);
/// assert_eq!(slots, vec![Some(0), None, Some(1000), Some(2000)]);
/// ```
pub fn assign_slots(misses: impl IntoIterator<Item = bool>, spacing_ms: u64) -> Vec<Option<u64>> {
    let mut next_slot = 0;
    misses
        .into_iter()
        .map(|miss| {
            if !miss {
                return None;
            }
            let slot = next_slot;
            next_slot += spacing_ms;
            Some(slot)
        })
        .collect()
}

/// Attach raw map features to every waypoint, preserving order.
///
/// With [`FailurePolicy::Abort`] the first provider error is returned and
/// nothing else; with [`FailurePolicy::Skip`] failed waypoints are left out.
pub async fn enrich_trail<P: MapProvider>(
    waypoints: &[TrailPoint],
    maps: &MapCache<P>,
    config: &EnrichConfig,
) -> Result<Vec<WaypointFeatures>> {
    let start = Instant::now();

    let areas: Vec<_> = waypoints
        .iter()
        .map(|w| surround_area(w.latitude, w.longitude, config.area_size_m))
        .collect();
    let keys: Vec<_> = areas.iter().map(|a| maps.area_key(a)).collect();

    // Phase 1: cache lookups
    let cached = join_all(keys.iter().map(|k| maps.cached(k))).await;

    // Phase 2: slot assignment
    let slots = assign_slots(cached.iter().map(Option::is_none), config.spacing_ms);
    let miss_count = slots.iter().filter(|s| s.is_some()).count();

    info!(
        "[enrich_trail] {} waypoints: {} cached, {} to fetch (spacing: {}ms)",
        waypoints.len(),
        waypoints.len() - miss_count,
        miss_count,
        config.spacing_ms
    );

    // Phase 3: dispatch
    let tasks = cached
        .into_iter()
        .zip(slots)
        .zip(areas.iter().zip(keys.iter()))
        .enumerate()
        .map(|(index, ((hit, slot), (area, key)))| resolve(maps, index, hit, slot, area, key));

    let results: Vec<WaypointFeatures> = match config.failure_policy {
        FailurePolicy::Abort => try_join_all(tasks)
            .await?
            .into_iter()
            .zip(waypoints)
            .map(|(features, waypoint)| WaypointFeatures {
                waypoint: waypoint.clone(),
                features,
            })
            .collect(),
        FailurePolicy::Skip => join_all(tasks)
            .await
            .into_iter()
            .zip(waypoints)
            .filter_map(|(outcome, waypoint)| match outcome {
                Ok(features) => Some(WaypointFeatures {
                    waypoint: waypoint.clone(),
                    features,
                }),
                Err(e) => {
                    warn!(
                        "[enrich_trail] Skipping waypoint at {} ({}, {}): {}",
                        waypoint.timestamp, waypoint.latitude, waypoint.longitude, e
                    );
                    None
                }
            })
            .collect(),
    };

    info!(
        "[enrich_trail] DONE: {}/{} waypoints in {:.2}s",
        results.len(),
        waypoints.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(results)
}

/// Resolve one waypoint: a cache hit as-is, a miss after waiting for its slot.
async fn resolve<P: MapProvider>(
    maps: &MapCache<P>,
    index: usize,
    hit: Option<Vec<MapFeature>>,
    slot: Option<u64>,
    area: &BoundingBox,
    key: &CacheKey,
) -> Result<Vec<MapFeature>> {
    if let Some(features) = hit {
        return Ok(features);
    }

    let wait = slot.unwrap_or(0);
    if wait > 0 {
        debug!("[Dispatch #{}] Waiting {}ms for slot", index, wait);
    }
    delay(wait).await;

    let fetch_start = Instant::now();
    let features = maps.fetch_and_store(area, key).await?;
    debug!(
        "[Fetch #{}] {} features in {:?}",
        index,
        features.len(),
        fetch_start.elapsed()
    );
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_dirs::scratch_dir;
    use crate::error::SpyError;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant as TokioInstant;

    /// Records when each area was requested; can fail or stall per longitude.
    struct RecordingMaps {
        calls: Mutex<Vec<(f64, TokioInstant)>>,
        fail_near: Option<f64>,
        latency_ms: fn(f64) -> u64,
    }

    impl RecordingMaps {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_near: None,
                latency_ms: |_| 0,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Call offsets from `start`, keyed by waypoint longitude.
        fn offsets(&self, start: TokioInstant) -> Vec<(f64, Duration)> {
            let mut calls: Vec<(f64, Duration)> = self
                .calls
                .lock()
                .unwrap()
                .iter()
                .map(|(lng, at)| (*lng, at.duration_since(start)))
                .collect();
            calls.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
            calls
        }
    }

    impl MapProvider for RecordingMaps {
        async fn fetch_map_data(&self, area: &BoundingBox) -> Result<Vec<MapFeature>> {
            let lng = ((area.lng0 + area.lng1) / 2.0 * 1000.0).round() / 1000.0;
            self.calls.lock().unwrap().push((lng, TokioInstant::now()));

            let latency = (self.latency_ms)(lng);
            if latency > 0 {
                tokio::time::sleep(Duration::from_millis(latency)).await;
            }

            if self.fail_near.map_or(false, |f| (f - lng).abs() < 1e-6) {
                return Err(SpyError::provider("test", "HTTP 500"));
            }

            let json = format!(r#"[{{"type": "way", "id": {}, "tags": {{"name": "Spot"}}}}]"#, (lng * 1000.0) as u64);
            Ok(serde_json::from_str(&json)?)
        }
    }

    fn waypoints(n: usize) -> Vec<TrailPoint> {
        (0..n)
            .map(|i| TrailPoint::new(10.0, i as f64, 1_000 + i as i64 * 60))
            .collect()
    }

    fn config(spacing_ms: u64) -> EnrichConfig {
        EnrichConfig {
            spacing_ms,
            ..EnrichConfig::default()
        }
    }

    #[test]
    fn test_assign_slots_skips_hits() {
        assert_eq!(assign_slots(Vec::<bool>::new(), 1000), vec![]);
        assert_eq!(assign_slots([false, false], 1000), vec![None, None]);
        assert_eq!(
            assign_slots([false, true, false, true], 250),
            vec![None, Some(0), None, Some(250)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_misses_are_spaced() {
        let maps = MapCache::new(scratch_dir("spaced"), RecordingMaps::new()).unwrap();
        let trail = waypoints(4);

        let start = TokioInstant::now();
        let result = enrich_trail(&trail, &maps, &config(1000)).await.unwrap();

        assert_eq!(result.len(), 4);
        let offsets = maps.provider().offsets(start);
        assert_eq!(offsets.len(), 4);
        for (k, (_, offset)) in offsets.iter().enumerate() {
            assert!(
                *offset >= Duration::from_millis(k as u64 * 1000),
                "fetch {} started after {:?}",
                k,
                offset
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hits_do_not_take_slots() {
        let maps = MapCache::new(scratch_dir("hits"), RecordingMaps::new()).unwrap();
        let trail = waypoints(4);

        // Warm the cache for the second waypoint only
        let warm = enrich_trail(&trail[1..2], &maps, &config(1000)).await.unwrap();
        assert_eq!(warm.len(), 1);
        maps.provider().calls.lock().unwrap().clear();

        let start = TokioInstant::now();
        let result = enrich_trail(&trail, &maps, &config(1000)).await.unwrap();
        assert_eq!(result.len(), 4);

        let offsets = maps.provider().offsets(start);
        let lngs: Vec<f64> = offsets.iter().map(|(lng, _)| *lng).collect();
        assert_eq!(lngs, vec![0.0, 2.0, 3.0]);

        // Third waypoint is only the second miss
        assert!(offsets[1].1 >= Duration::from_millis(1000));
        assert!(offsets[1].1 < Duration::from_millis(2000));
        assert!(offsets[2].1 >= Duration::from_millis(2000));
        assert!(offsets[2].1 < Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_hits_resolve_without_delay() {
        let maps = MapCache::new(scratch_dir("allhits"), RecordingMaps::new()).unwrap();
        let trail = waypoints(3);

        let first = enrich_trail(&trail, &maps, &config(1000)).await.unwrap();
        assert_eq!(maps.provider().call_count(), 3);

        let start = TokioInstant::now();
        let second = enrich_trail(&trail, &maps, &config(1000)).await.unwrap();

        assert!(start.elapsed() < Duration::from_millis(1000));
        assert_eq!(maps.provider().call_count(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_when_fetches_finish_out_of_order() {
        let mut provider = RecordingMaps::new();
        // Earlier waypoints answer much more slowly
        provider.latency_ms = |lng| ((5.0 - lng) * 10_000.0) as u64;
        let maps = MapCache::new(scratch_dir("order"), provider).unwrap();
        let trail = waypoints(5);

        let result = enrich_trail(&trail, &maps, &config(100)).await.unwrap();

        let lngs: Vec<f64> = result.iter().map(|w| w.waypoint.longitude).collect();
        assert_eq!(lngs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let ids: Vec<u64> = result.iter().map(|w| w.features[0].id).collect();
        assert_eq!(ids, vec![0, 1000, 2000, 3000, 4000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_policy_propagates_failure() {
        let mut provider = RecordingMaps::new();
        provider.fail_near = Some(1.0);
        let maps = MapCache::new(scratch_dir("abort"), provider).unwrap();

        let result = enrich_trail(&waypoints(3), &maps, &config(10)).await;
        assert!(matches!(result, Err(SpyError::Provider { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_policy_drops_failed_waypoint() {
        let mut provider = RecordingMaps::new();
        provider.fail_near = Some(1.0);
        let maps = MapCache::new(scratch_dir("skip"), provider).unwrap();
        let config = EnrichConfig {
            spacing_ms: 10,
            failure_policy: FailurePolicy::Skip,
            ..EnrichConfig::default()
        };

        let result = enrich_trail(&waypoints(3), &maps, &config).await.unwrap();
        let lngs: Vec<f64> = result.iter().map(|w| w.waypoint.longitude).collect();
        assert_eq!(lngs, vec![0.0, 2.0]);
    }

    #[tokio::test]
    async fn test_empty_trail() {
        let maps = MapCache::new(scratch_dir("empty"), RecordingMaps::new()).unwrap();
        let result = enrich_trail(&[], &maps, &EnrichConfig::default()).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(maps.provider().call_count(), 0);
    }
}
