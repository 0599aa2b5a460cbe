//! # External Providers
//!
//! HTTP clients for the services the logistics endpoints lean on.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  handler                                                                │
//! │     │                                                                   │
//! │     ├── Arc<dyn TravelTimeProvider> ── RoutingClient ──► OSRM          │
//! │     │        (failure → haversine heuristic)                            │
//! │     │                                                                   │
//! │     └── Arc<dyn Geocoder> ─────────── GeocodingClient ──► Nominatim    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers only see the traits, so tests swap in fakes.

pub mod geocoding;
pub mod routing;

pub use geocoding::{GeocodeMatch, Geocoder, GeocodingClient};
pub use routing::{resolve_travel, Route, RoutingClient, TravelTimeProvider};

use thiserror::Error;

/// Failure talking to a routing or geocoding service.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Turned off in configuration.
    #[error("{0} is disabled")]
    Disabled(&'static str),

    /// Request failed, timed out, or returned an error status.
    #[error("{provider} request failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
    },

    /// The service answered but the body made no sense.
    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    /// The service found nothing for the input.
    #[error("{provider} found no result")]
    NoResult { provider: &'static str },
}

impl ProviderError {
    pub(crate) fn request(provider: &'static str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "timed out".to_string()
        } else {
            err.to_string()
        };
        ProviderError::Request { provider, message }
    }

    pub(crate) fn invalid(provider: &'static str, message: impl Into<String>) -> Self {
        ProviderError::InvalidResponse {
            provider,
            message: message.into(),
        }
    }
}

pub(crate) fn build_http_client(
    timeout: std::time::Duration,
    user_agent: &str,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
