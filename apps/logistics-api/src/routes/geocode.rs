//! Address geocoding endpoint.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use entrega_core::validation::validate_address_query;
use entrega_core::Coordinates;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::providers::ProviderError;
use crate::AppState;

/// Creates the geocoding routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/geocode", post(geocode))
}

#[derive(Debug, Deserialize)]
pub struct GeocodeRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct GeocodeResponse {
    pub coordinates: Coordinates,
    pub display_name: String,
    /// Straight-line distance from the establishment.
    pub distance_km: f64,
}

/// POST `/geocode` - Locate a typed address.
async fn geocode(
    State(state): State<AppState>,
    Json(req): Json<GeocodeRequest>,
) -> ApiResult<Json<GeocodeResponse>> {
    let query = validate_address_query(&req.address)?;

    let found = match state.geocoder.geocode(&query).await {
        Ok(found) => found,
        Err(ProviderError::NoResult { .. }) => {
            return Err(ApiError::new(
                ErrorCode::NotFound,
                format!("Address not found: {}", query),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    let distance_km = state
        .config
        .establishment
        .origin
        .distance_to(&found.coordinates)
        .km();

    Ok(Json(GeocodeResponse {
        coordinates: found.coordinates,
        display_name: found.display_name,
        distance_km,
    }))
}
