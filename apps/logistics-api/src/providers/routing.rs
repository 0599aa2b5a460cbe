//! # Routing Client
//!
//! Road travel time between the kitchen and the customer, from an
//! OSRM-compatible `route/v1/driving` endpoint.
//!
//! ## Fallback
//! ```text
//! resolve_travel(provider, origin, destination)
//!      │
//!      ├── provider.route() Ok  ──► TravelSource::Routed { seconds }
//!      │
//!      └── Err (disabled, timeout, HTTP error, "NoRoute")
//!                               ──► TravelSource::Heuristic { haversine }
//! ```
//!
//! Routing never fails an ETA request; the estimate reports which source
//! was used.

use async_trait::async_trait;
use entrega_core::eta::TravelSource;
use entrega_core::geo::Distance;
use entrega_core::Coordinates;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{build_http_client, trim_base_url, ProviderError};
use crate::config::RoutingSettings;

const PROVIDER: &str = "routing";

/// A routed trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub duration_secs: u64,
    pub distance: Distance,
}

/// Anything that can time a trip by road.
#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    async fn route(&self, from: &Coordinates, to: &Coordinates) -> Result<Route, ProviderError>;
}

/// Picks the travel time for an ETA, falling back to the straight-line
/// heuristic when the provider cannot answer.
pub async fn resolve_travel(
    provider: &dyn TravelTimeProvider,
    from: &Coordinates,
    to: &Coordinates,
) -> TravelSource {
    match provider.route(from, to).await {
        Ok(route) => {
            debug!(
                seconds = route.duration_secs,
                meters = route.distance.meters(),
                "Routed travel time"
            );
            TravelSource::Routed {
                seconds: route.duration_secs,
            }
        }
        Err(ProviderError::Disabled(_)) => TravelSource::Heuristic {
            distance: from.distance_to(to),
        },
        Err(e) => {
            warn!(error = %e, "Routing failed, using heuristic travel time");
            TravelSource::Heuristic {
                distance: from.distance_to(to),
            }
        }
    }
}

// =============================================================================
// OSRM
// =============================================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Seconds.
    duration: f64,
    /// Meters.
    distance: f64,
}

/// HTTP client for an OSRM server.
#[derive(Debug, Clone)]
pub struct RoutingClient {
    client: reqwest::Client,
    base_url: String,
    enabled: bool,
}

impl RoutingClient {
    /// Builds a client with the configured timeout.
    pub fn new(settings: &RoutingSettings, user_agent: &str) -> Result<Self, reqwest::Error> {
        Ok(RoutingClient {
            client: build_http_client(settings.timeout(), user_agent)?,
            base_url: trim_base_url(&settings.base_url),
            enabled: settings.enabled,
        })
    }

    fn route_url(&self, from: &Coordinates, to: &Coordinates) -> String {
        // OSRM takes lng,lat pairs
        format!(
            "{}/route/v1/driving/{:.6},{:.6};{:.6},{:.6}?overview=false",
            self.base_url, from.lng, from.lat, to.lng, to.lat
        )
    }
}

#[async_trait]
impl TravelTimeProvider for RoutingClient {
    async fn route(&self, from: &Coordinates, to: &Coordinates) -> Result<Route, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::Disabled(PROVIDER));
        }

        let url = self.route_url(from, to);
        let body: OsrmResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::request(PROVIDER, e))?
            .json()
            .await
            .map_err(|e| ProviderError::invalid(PROVIDER, e.to_string()))?;

        parse_route(body)
    }
}

fn parse_route(body: OsrmResponse) -> Result<Route, ProviderError> {
    if body.code != "Ok" {
        return match body.code.as_str() {
            "NoRoute" | "NoSegment" => Err(ProviderError::NoResult { provider: PROVIDER }),
            _ => Err(ProviderError::invalid(
                PROVIDER,
                format!("{}: {}", body.code, body.message.unwrap_or_default()),
            )),
        };
    }

    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or(ProviderError::NoResult { provider: PROVIDER })?;

    if !route.duration.is_finite() || route.duration < 0.0 || !route.distance.is_finite() {
        return Err(ProviderError::invalid(PROVIDER, "negative or non-finite route"));
    }

    Ok(Route {
        duration_secs: route.duration.round() as u64,
        distance: Distance::from_meters(route.distance.max(0.0).round() as u64),
    })
}
