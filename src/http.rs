//! HTTP clients for the external providers.
//!
//! - [`Flightradar24Client`] - flight records with their position trail
//! - [`OsmClient`] - raw map elements from the OpenStreetMap API v0.6
//! - [`LibreTranslate`] - name translation, never fails
//!
//! All clients share one reqwest configuration (keepalive, pooled
//! connections, 30s timeout). There are no retries here: failures go back to
//! the caller, which decides whether the batch survives.

use std::time::{Duration, Instant};

use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpyError};
use crate::providers::{FlightProvider, MapProvider};
use crate::translate::Translator;
use crate::{BoundingBox, FlightRecord, MapFeature};

const FLIGHTRADAR24_URL: &str = "https://data-live.flightradar24.com";
const OSM_API_URL: &str = "https://api.openstreetmap.org/api/0.6";
const LIBRETRANSLATE_URL: &str = "http://localhost:5000/translate";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the shared HTTP client.
fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("flight-spy/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .timeout(timeout)
        .build()
        .map_err(|e| SpyError::Http(format!("Failed to create HTTP client: {}", e)))
}

/// GET `url` and decode the JSON body, logging a timing breakdown.
async fn get_json<T: for<'de> Deserialize<'de>>(client: &Client, provider: &str, url: &str) -> Result<T> {
    let req_start = Instant::now();

    // Phase 1: send request, receive headers
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| SpyError::provider(provider, format!("Request error: {}", e)))?;
    let headers_elapsed = req_start.elapsed();

    let status = resp.status();
    if !status.is_success() {
        return Err(SpyError::provider(provider, format!("HTTP {}", status)));
    }

    // Phase 2: download body
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| SpyError::provider(provider, format!("Body download error: {}", e)))?;

    // Phase 3: JSON decode
    let json_start = Instant::now();
    let data = serde_json::from_slice(&bytes)
        .map_err(|e| SpyError::provider(provider, format!("JSON parse error: {}", e)))?;

    info!(
        "[{}] headers={:?} json={:?} total={:?} ({:.1}KB)",
        provider,
        headers_elapsed,
        json_start.elapsed(),
        req_start.elapsed(),
        bytes.len() as f64 / 1024.0
    );

    Ok(data)
}

// ============================================================================
// Flightradar24
// ============================================================================

/// Flightradar24 click-handler client.
///
/// Flight ids are the hex ids from a playback URL (the part after `#`).
pub struct Flightradar24Client {
    client: Client,
    base_url: String,
}

impl Flightradar24Client {
    pub fn new() -> Result<Self> {
        Self::with_base_url(FLIGHTRADAR24_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(REQUEST_TIMEOUT)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn flight_url(&self, flight_id: &str) -> String {
        format!("{}/clickhandler/?version=1.5&flight={}", self.base_url, flight_id)
    }
}

impl FlightProvider for Flightradar24Client {
    async fn fetch_flight(&self, flight_id: &str) -> Result<FlightRecord> {
        let url = self.flight_url(flight_id);
        let record: FlightRecord = get_json(&self.client, "flightradar24", &url).await?;
        debug!("[flightradar24] {} has {} trail samples", flight_id, record.trail.len());
        Ok(record)
    }
}

// ============================================================================
// OpenStreetMap
// ============================================================================

/// API response for the `map` endpoint
#[derive(Debug, Deserialize)]
struct OsmMapResponse {
    #[serde(default)]
    elements: Vec<MapFeature>,
}

/// OpenStreetMap API v0.6 client.
pub struct OsmClient {
    client: Client,
    base_url: String,
}

impl OsmClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(OSM_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(REQUEST_TIMEOUT)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `map.json` URL; the bbox order is left, bottom, right, top.
    pub fn map_url(&self, area: &BoundingBox) -> String {
        format!(
            "{}/map.json?bbox={},{},{},{}",
            self.base_url, area.lng0, area.lat0, area.lng1, area.lat1
        )
    }
}

impl MapProvider for OsmClient {
    async fn fetch_map_data(&self, area: &BoundingBox) -> Result<Vec<MapFeature>> {
        let response: OsmMapResponse = get_json(&self.client, "openstreetmap", &self.map_url(area)).await?;
        Ok(response.elements)
    }
}

// ============================================================================
// LibreTranslate
// ============================================================================

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    alternatives: u32,
    api_key: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: Option<String>,
}

/// Client for a LibreTranslate server.
pub struct LibreTranslate {
    client: Client,
    url: String,
}

impl LibreTranslate {
    /// Client for the default local server.
    pub fn local() -> Result<Self> {
        Self::new(LIBRETRANSLATE_URL)
    }

    /// Client for the `/translate` endpoint at `url`.
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(TRANSLATE_TIMEOUT)?,
            url: url.to_string(),
        })
    }

    async fn request(&self, text: &str, target_language: &str) -> std::result::Result<Option<String>, reqwest::Error> {
        let body = TranslateRequest {
            q: text,
            source: "auto",
            target: target_language,
            format: "text",
            alternatives: 3,
            api_key: "",
        };
        let response: TranslateResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.translated_text)
    }
}

impl Translator for LibreTranslate {
    async fn translate(&self, text: &str, target_language: &str) -> String {
        match self.request(text, target_language).await {
            Ok(Some(translated)) => translated,
            Ok(None) => text.to_string(),
            Err(e) => {
                // Usually no translation server running
                debug!("[LibreTranslate] Falling back to original text: {}", e);
                text.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osm_map_url() {
        let client = OsmClient::with_base_url("https://osm.example/api/0.6/").unwrap();
        let area = BoundingBox { lat0: 51.5, lng0: -0.2, lat1: 51.6, lng1: -0.1 };
        assert_eq!(client.map_url(&area), "https://osm.example/api/0.6/map.json?bbox=-0.2,51.5,-0.1,51.6");
    }

    #[test]
    fn test_flight_url() {
        let client = Flightradar24Client::new().unwrap();
        assert_eq!(
            client.flight_url("36e9026e"),
            "https://data-live.flightradar24.com/clickhandler/?version=1.5&flight=36e9026e"
        );
    }

    #[test]
    fn test_osm_response_parsing() {
        let json = r#"{
            "version": "0.6",
            "elements": [
                {"type": "node", "id": 1, "lat": 51.5, "lon": -0.1},
                {"type": "way", "id": 2, "nodes": [1], "tags": {"name": "Thames", "waterway": "river"}}
            ]
        }"#;
        let response: OsmMapResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.elements.len(), 2);
        assert_eq!(response.elements[1].tag("name"), Some("Thames"));
    }

    #[tokio::test]
    async fn test_translate_falls_back_when_unreachable() {
        // Port 9 (discard) is closed on test machines
        let translator = LibreTranslate::new("http://127.0.0.1:9/translate").unwrap();
        assert_eq!(translator.translate("Lac Léman", "en").await, "Lac Léman");
    }

    #[tokio::test]
    async fn test_unreachable_map_provider_is_an_error() {
        let client = OsmClient::with_base_url("http://127.0.0.1:9").unwrap();
        let area = BoundingBox { lat0: 0.0, lng0: 0.0, lat1: 0.1, lng1: 0.1 };
        let result = client.fetch_map_data(&area).await;
        assert!(matches!(result, Err(SpyError::Provider { .. })));
    }
}
