//! # Geocoding Client
//!
//! Turns a typed address into coordinates through a Nominatim-compatible
//! `search?format=json` endpoint. The PWA calls it before quoting a fee.

use async_trait::async_trait;
use entrega_core::Coordinates;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{build_http_client, trim_base_url, ProviderError};
use crate::config::GeocodingSettings;

const PROVIDER: &str = "geocoding";

/// Best match for an address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeMatch {
    pub coordinates: Coordinates,
    pub display_name: String,
}

/// Anything that can locate an address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<GeocodeMatch, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// HTTP client for a Nominatim server.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: reqwest::Client,
    base_url: String,
    country_codes: Option<String>,
    enabled: bool,
}

impl GeocodingClient {
    pub fn new(settings: &GeocodingSettings) -> Result<Self, reqwest::Error> {
        Ok(GeocodingClient {
            client: build_http_client(settings.timeout(), &settings.user_agent)?,
            base_url: trim_base_url(&settings.base_url),
            country_codes: settings.country_codes.clone(),
            enabled: settings.enabled,
        })
    }
}

#[async_trait]
impl Geocoder for GeocodingClient {
    async fn geocode(&self, query: &str) -> Result<GeocodeMatch, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::Disabled(PROVIDER));
        }

        let url = format!("{}/search", self.base_url);
        let mut params = vec![("q", query), ("format", "json"), ("limit", "1")];
        if let Some(codes) = self.country_codes.as_deref() {
            params.push(("countrycodes", codes));
        }

        let places: Vec<NominatimPlace> = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::request(PROVIDER, e))?
            .json()
            .await
            .map_err(|e| ProviderError::invalid(PROVIDER, e.to_string()))?;

        let found = first_match(places)?;
        debug!(lat = found.coordinates.lat, lng = found.coordinates.lng, "Address geocoded");
        Ok(found)
    }
}

fn first_match(places: Vec<NominatimPlace>) -> Result<GeocodeMatch, ProviderError> {
    let place = places
        .into_iter()
        .next()
        .ok_or(ProviderError::NoResult { provider: PROVIDER })?;

    let lat: f64 = place
        .lat
        .parse()
        .map_err(|_| ProviderError::invalid(PROVIDER, format!("bad lat '{}'", place.lat)))?;
    let lng: f64 = place
        .lon
        .parse()
        .map_err(|_| ProviderError::invalid(PROVIDER, format!("bad lon '{}'", place.lon)))?;

    let coordinates =
        Coordinates::new(lat, lng).map_err(|e| ProviderError::invalid(PROVIDER, e.to_string()))?;

    Ok(GeocodeMatch {
        coordinates,
        display_name: place.display_name,
    })
}
