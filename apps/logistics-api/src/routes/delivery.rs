//! Delivery fee and ETA endpoints.
//!
//! ```text
//! POST /delivery/quote   destination (+ zone, subtotal) ──► fee, distance, terms
//! POST /delivery/eta     order type, destination, zone  ──► min/max window
//! ```

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use entrega_core::eta::{self, EtaEstimate, TravelSource};
use entrega_core::validation::validate_uuid;
use entrega_core::zone::resolve_terms;
use entrega_core::{
    Coordinates, DeliveryQuote, DeliveryTerms, FeePolicy, Money, OrderType, ValidationError,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::providers::resolve_travel;
use crate::AppState;

/// Creates the delivery routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/delivery/quote", post(quote))
        .route("/delivery/eta", post(estimate))
}

// =============================================================================
// Shared with orders
// =============================================================================

/// Establishment defaults with the zone's overrides applied.
pub(crate) async fn load_terms(
    state: &AppState,
    zone_id: Option<&str>,
) -> ApiResult<DeliveryTerms> {
    let defaults = state.db.zones().get_defaults().await?;

    let zone = match zone_id {
        Some(id) => {
            validate_uuid(id)?;
            let zone = state
                .db
                .zones()
                .get_by_id(id)
                .await?
                .ok_or_else(|| ApiError::not_found("Zone", id))?;
            Some(zone)
        }
        None => None,
    };

    Ok(resolve_terms(&defaults, zone.as_ref()))
}

/// ETA for an order placed at `placed_at`.
///
/// Delivery windows are raised to the advertised zone times. A delivery
/// without a destination is only priced by a flat-fee zone, and then
/// the advertised window stands in for travel. Other order types have
/// no travel.
pub(crate) async fn estimate_for(
    state: &AppState,
    order_type: OrderType,
    destination: Option<&Coordinates>,
    terms: &DeliveryTerms,
    placed_at: DateTime<Utc>,
) -> ApiResult<EtaEstimate> {
    let minute = state.local_minute_of_day(placed_at);

    if order_type != OrderType::Delivery {
        return Ok(eta::estimate(&state.config.eta, minute, TravelSource::None));
    }

    let Some(destination) = destination else {
        if !matches!(terms.fee_policy, FeePolicy::Flat { .. }) {
            return Err(ValidationError::required("destination").into());
        }
        return Ok(eta::estimate(&state.config.eta, minute, TravelSource::None)
            .with_floor(terms.eta_min_minutes, terms.eta_max_minutes));
    };
    destination.validate()?;

    let origin = &state.config.establishment.origin;
    let travel = resolve_travel(state.routing.as_ref(), origin, destination).await;

    let estimate = eta::estimate(&state.config.eta, minute, travel)
        .with_floor(terms.eta_min_minutes, terms.eta_max_minutes);

    debug!(
        prep = estimate.prep_minutes,
        travel = estimate.travel_minutes,
        source = ?estimate.source,
        "ETA estimated"
    );
    Ok(estimate)
}

// =============================================================================
// Quote
// =============================================================================

/// Request body of `POST /delivery/quote`.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub destination: Coordinates,
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Cart subtotal, for free delivery and the minimum order.
    #[serde(default)]
    pub subtotal: Option<Money>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote: DeliveryQuote,
    pub terms: DeliveryTerms,
    /// `None` when no subtotal was sent.
    pub meets_minimum: Option<bool>,
}

/// POST `/delivery/quote` - Price a delivery to a destination.
async fn quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> ApiResult<Json<QuoteResponse>> {
    let terms = load_terms(&state, req.zone_id.as_deref()).await?;
    let quote = terms.quote(&state.config.establishment.origin, &req.destination, req.subtotal)?;

    debug!(
        distance_km = quote.distance_km,
        fee = %quote.fee,
        zone = ?terms.zone_id,
        "Delivery quoted"
    );

    let meets_minimum = req.subtotal.map(|s| terms.check_minimum_order(s).is_ok());
    Ok(Json(QuoteResponse {
        quote,
        terms,
        meets_minimum,
    }))
}

// =============================================================================
// ETA
// =============================================================================

fn default_order_type() -> OrderType {
    OrderType::Delivery
}

/// Request body of `POST /delivery/eta`.
#[derive(Debug, Deserialize)]
pub struct EtaRequest {
    #[serde(default = "default_order_type")]
    pub order_type: OrderType,
    #[serde(default)]
    pub destination: Option<Coordinates>,
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Defaults to now.
    #[serde(default)]
    pub placed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EtaResponse {
    #[serde(flatten)]
    pub estimate: EtaEstimate,
    pub earliest_at: DateTime<Utc>,
    pub latest_at: DateTime<Utc>,
}

/// POST `/delivery/eta` - Estimate the delivery window.
async fn estimate(
    State(state): State<AppState>,
    Json(req): Json<EtaRequest>,
) -> ApiResult<Json<EtaResponse>> {
    let terms = load_terms(&state, req.zone_id.as_deref()).await?;
    let placed_at = req.placed_at.unwrap_or_else(Utc::now);

    let estimate = estimate_for(
        &state,
        req.order_type,
        req.destination.as_ref(),
        &terms,
        placed_at,
    )
    .await?;

    let (earliest_at, latest_at) = estimate.window_from(placed_at);
    Ok(Json(EtaResponse {
        estimate,
        earliest_at,
        latest_at,
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{send, state, state_with, FakeRouting};
    use axum::http::StatusCode;
    use entrega_core::{Money, NewZone};
    use serde_json::json;

    #[tokio::test]
    async fn test_quote_inside_included_radius() {
        let state = state().await;
        // ~1 km from the kitchen
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/quote",
            Some(json!({ "destination": { "lat": -23.5750, "lng": -46.6850 } })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quote"]["fee"], 500);
        assert_eq!(body["quote"]["distance_fee"], 0);
        assert_eq!(body["terms"]["zone_id"], serde_json::Value::Null);
        assert_eq!(body["meets_minimum"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_quote_beyond_radius_and_minimum() {
        let state = state().await;
        // ~6 km south
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/quote",
            Some(json!({
                "destination": { "lat": -23.6200, "lng": -46.6850 },
                "subtotal": 1500
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let fee = body["quote"]["fee"].as_i64().unwrap();
        let distance_fee = body["quote"]["distance_fee"].as_i64().unwrap();
        assert!(distance_fee > 0);
        assert_eq!(fee, 500 + distance_fee);
        assert_eq!(body["meets_minimum"], false);
    }

    #[tokio::test]
    async fn test_quote_with_flat_zone() {
        let state = state().await;
        let zone = state
            .db
            .zones()
            .create(NewZone {
                name: "Pinheiros".to_string(),
                fee_override: Some(Money::from_cents(400)),
                minimum_order_override: None,
                eta_min_override: None,
                eta_max_override: None,
            })
            .await
            .unwrap();

        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/quote",
            Some(json!({
                "destination": { "lat": -23.6200, "lng": -46.6850 },
                "zone_id": zone.id
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quote"]["fee"], 400);
        assert_eq!(body["terms"]["fee_policy"]["kind"], "flat");
    }

    #[tokio::test]
    async fn test_quote_unknown_zone() {
        let state = state().await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/quote",
            Some(json!({
                "destination": { "lat": -23.57, "lng": -46.68 },
                "zone_id": uuid::Uuid::new_v4().to_string()
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_quote_rejects_bad_coordinates() {
        let state = state().await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/quote",
            Some(json!({ "destination": { "lat": -123.0, "lng": -46.68 } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_eta_routed() {
        let state = state_with(FakeRouting::Seconds(600)).await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/eta",
            Some(json!({
                "destination": { "lat": -23.5800, "lng": -46.6700 },
                "placed_at": "2026-10-18T10:00:00Z"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "routing");
        assert_eq!(body["prep_minutes"], 20);
        assert_eq!(body["travel_minutes"], 10);
        // 30 min computed, raised to the advertised 30..50
        assert_eq!(body["total_min_minutes"], 30);
        assert_eq!(body["total_max_minutes"], 50);
        assert_eq!(body["earliest_at"], "2026-10-18T10:30:00Z");
    }

    #[tokio::test]
    async fn test_eta_falls_back_to_heuristic() {
        let state = state_with(FakeRouting::Down).await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/eta",
            Some(json!({
                "destination": { "lat": -23.6200, "lng": -46.6850 },
                "placed_at": "2026-10-18T12:00:00Z"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "heuristic");
        // Lunch peak
        assert_eq!(body["prep_minutes"], 35);
        let min = body["total_min_minutes"].as_u64().unwrap();
        let max = body["total_max_minutes"].as_u64().unwrap();
        assert!(max >= min && min >= 35);
    }

    #[tokio::test]
    async fn test_eta_pickup_has_no_travel() {
        let state = state().await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/eta",
            Some(json!({ "order_type": "pickup", "placed_at": "2026-10-18T10:00:00Z" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "none");
        assert_eq!(body["total_min_minutes"], 20);
        assert_eq!(body["total_max_minutes"], 30);
    }

    #[tokio::test]
    async fn test_eta_delivery_needs_destination() {
        let state = state().await;
        let (status, _) = send(&state, "POST", "/api/v1/delivery/eta", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_eta_flat_zone_without_destination() {
        let state = state().await;
        let zone = state
            .db
            .zones()
            .create(NewZone {
                name: "Centro".to_string(),
                fee_override: Some(Money::from_cents(700)),
                minimum_order_override: None,
                eta_min_override: Some(40),
                eta_max_override: Some(60),
            })
            .await
            .unwrap();

        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/eta",
            Some(json!({ "zone_id": zone.id, "placed_at": "2026-10-18T10:00:00Z" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "none");
        assert_eq!(body["total_min_minutes"], 40);
        assert_eq!(body["total_max_minutes"], 60);
    }

    #[tokio::test]
    async fn test_quote_out_of_range() {
        let state = state().await;
        let (_, mut defaults) = send(&state, "GET", "/api/v1/zones/defaults", None).await;
        defaults["fee_rule"]["max_distance_km"] = json!(5.0);
        let (status, _) = send(&state, "PUT", "/api/v1/zones/defaults", Some(defaults)).await;
        assert_eq!(status, StatusCode::OK);

        // ~6 km south
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/delivery/quote",
            Some(json!({ "destination": { "lat": -23.6200, "lng": -46.6850 } })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "OUT_OF_DELIVERY_RANGE");
    }
}
