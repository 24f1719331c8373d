//! External data providers and their cached wrappers.
//!
//! [`FlightProvider`] and [`MapProvider`] are the seams to the outside world;
//! the concrete HTTP clients live in [`crate::http`]. [`FlightCache`] and
//! [`MapCache`] each own a [`BlobCache`] and a provider and answer from disk
//! whenever they can.

use std::future::Future;
use std::path::Path;

use log::{debug, info, warn};

use crate::cache::{BlobCache, CacheKey};
use crate::error::Result;
use crate::reducer::{reduce_trail, ReduceConfig};
use crate::{BoundingBox, FlightRecord, MapFeature, TrailPoint};

/// Source of flight records.
///
/// Failures propagate to the caller; no retry happens at this boundary.
pub trait FlightProvider: Send + Sync {
    /// Fetch a flight with its trail in provider order (newest sample first).
    fn fetch_flight(&self, flight_id: &str) -> impl Future<Output = Result<FlightRecord>> + Send;
}

/// Source of raw map features inside a bounding box.
pub trait MapProvider: Send + Sync {
    fn fetch_map_data(&self, area: &BoundingBox) -> impl Future<Output = Result<Vec<MapFeature>>> + Send;
}

/// Flight records cached by flight id.
pub struct FlightCache<P> {
    cache: BlobCache<FlightRecord>,
    provider: P,
}

impl<P: FlightProvider> FlightCache<P> {
    /// Open the cache directory (created if missing) in front of `provider`.
    pub fn new(cache_dir: impl AsRef<Path>, provider: P) -> Result<Self> {
        Ok(Self {
            cache: BlobCache::new(cache_dir.as_ref())?,
            provider,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn flight_key(&self, flight_id: &str) -> CacheKey {
        self.cache.key(&["ff".into(), flight_id.into()])
    }

    /// The flight record, from disk if cached, otherwise fetched and stored.
    ///
    /// A failed cache write is logged and the fetched record is still returned.
    pub async fn fetch_flight(&self, flight_id: &str) -> Result<FlightRecord> {
        let key = self.flight_key(flight_id);
        if let Some(record) = self.cache.lookup(&key).await {
            debug!("[FlightCache] {} served from cache", flight_id);
            return Ok(record);
        }

        let record = self.provider.fetch_flight(flight_id).await?;
        info!("[FlightCache] fetched {} ({} trail samples)", flight_id, record.trail.len());
        if let Err(e) = self.cache.store(&key, &record).await {
            warn!("[FlightCache] Could not cache {}: {}", key, e);
        }
        Ok(record)
    }

    /// Fetch the flight and reduce its chronological trail to waypoints.
    pub async fn flight_trail(&self, flight_id: &str, config: &ReduceConfig) -> Result<Vec<TrailPoint>> {
        let record = self.fetch_flight(flight_id).await?;
        let trail = record.chronological_trail();
        Ok(reduce_trail(&trail, config))
    }
}

/// Map features cached by bounding box.
pub struct MapCache<P> {
    cache: BlobCache<Vec<MapFeature>>,
    provider: P,
}

impl<P: MapProvider> MapCache<P> {
    pub fn new(cache_dir: impl AsRef<Path>, provider: P) -> Result<Self> {
        Ok(Self {
            cache: BlobCache::new(cache_dir.as_ref())?,
            provider,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Cache key for an area: `area`, then lng0, lat0, lng1, lat1.
    pub fn area_key(&self, area: &BoundingBox) -> CacheKey {
        self.cache.key(&[
            "area".into(),
            area.lng0.into(),
            area.lat0.into(),
            area.lng1.into(),
            area.lat1.into(),
        ])
    }

    /// Cached features for `key`, if any.
    pub async fn cached(&self, key: &CacheKey) -> Option<Vec<MapFeature>> {
        self.cache.lookup(key).await
    }

    /// Call the provider and remember the answer under `key`.
    ///
    /// A failed cache write is logged and the fetched data is still returned.
    pub async fn fetch_and_store(&self, area: &BoundingBox, key: &CacheKey) -> Result<Vec<MapFeature>> {
        let features = self.provider.fetch_map_data(area).await?;
        if let Err(e) = self.cache.store(key, &features).await {
            warn!("[MapCache] Could not cache {}: {}", key, e);
        }
        Ok(features)
    }

    /// Features for an area, from disk if cached, otherwise fetched and stored.
    pub async fn get_map_data(&self, area: &BoundingBox) -> Result<Vec<MapFeature>> {
        let key = self.area_key(area);
        match self.cached(&key).await {
            Some(features) => Ok(features),
            None => self.fetch_and_store(area, &key).await,
        }
    }
}
