//! # logistics-api: Server Functions for Entrega
//!
//! The HTTP surface the PWA, back-office, kitchen/motoboy panels and PDV
//! call for everything that is more than a row update.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PWA / panels ──► axum Router (/api/v1)                                │
//! │                     │  TraceLayer · CorsLayer · TimeoutLayer            │
//! │                     ▼                                                   │
//! │                   handler (routes/*)                                   │
//! │                     │                                                   │
//! │         ┌───────────┼────────────────┬───────────────────┐              │
//! │         ▼           ▼                ▼                   ▼              │
//! │   entrega-core  entrega-db   TravelTimeProvider      Geocoder          │
//! │   fee · ETA ·   orders ·     (OSRM, heuristic        (Nominatim)       │
//! │   cash math     cash · zones  fallback)                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`] - `ApiConfig` (defaults → TOML → `ENTREGA_*` env)
//! - [`error`] - `ApiError` with machine code and HTTP status
//! - [`providers`] - routing and geocoding clients
//! - [`routes`] - endpoint handlers

pub mod config;
pub mod error;
pub mod providers;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, Utc};
use entrega_core::eta::minute_of_day;
use entrega_db::Database;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::providers::{Geocoder, TravelTimeProvider};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database handle (cheap to clone, shares the pool).
    pub db: Database,
    /// Loaded configuration.
    pub config: Arc<ApiConfig>,
    /// Road travel times for ETAs.
    pub routing: Arc<dyn TravelTimeProvider>,
    /// Address lookup.
    pub geocoder: Arc<dyn Geocoder>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: ApiConfig,
        routing: Arc<dyn TravelTimeProvider>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        AppState {
            db,
            config: Arc::new(config),
            routing,
            geocoder,
        }
    }

    /// Minute of the day on the establishment's clock.
    pub fn local_minute_of_day(&self, at: DateTime<Utc>) -> u16 {
        match self.config.establishment.offset() {
            Some(offset) => minute_of_day(at.with_timezone(&offset).time()),
            None => minute_of_day(at.time()),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_local_minute_of_day() {
        let mut state = state().await;
        let at = DateTime::parse_from_rfc3339("2026-10-18T15:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(state.local_minute_of_day(at), 15 * 60 + 30);

        let mut config = (*state.config).clone();
        config.establishment.utc_offset_minutes = -180;
        state.config = Arc::new(config);
        assert_eq!(state.local_minute_of_day(at), 12 * 60 + 30);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let state = state().await;
        let (status, _) = send(&state, "GET", "/api/v1/nothing-here", None).await;
        assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
    }
}
