//! Delivery zone and establishment default endpoints (admin back-office).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use entrega_core::{DeliveryZone, EstablishmentDefaults, Money, NewZone};
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Creates the zone routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/zones", get(list_zones).post(create_zone))
        .route("/zones/defaults", get(get_defaults).put(save_defaults))
        .route("/zones/{id}", get(get_zone).put(update_zone).delete(delete_zone))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListZonesQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET `/zones` - List zones by name.
async fn list_zones(
    State(state): State<AppState>,
    Query(query): Query<ListZonesQuery>,
) -> ApiResult<Json<Vec<DeliveryZone>>> {
    let zones = state.db.zones().list(query.include_inactive).await?;
    Ok(Json(zones))
}

/// POST `/zones` - Create a zone.
async fn create_zone(
    State(state): State<AppState>,
    Json(new): Json<NewZone>,
) -> ApiResult<(StatusCode, Json<DeliveryZone>)> {
    let zone = state.db.zones().create(new).await?;
    Ok((StatusCode::CREATED, Json(zone)))
}

/// GET `/zones/{id}`
async fn get_zone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeliveryZone>> {
    let zone = state
        .db
        .zones()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Zone", &id))?;
    Ok(Json(zone))
}

/// Full replacement of a zone's editable fields.
#[derive(Debug, Deserialize)]
pub struct UpdateZoneRequest {
    pub name: String,
    #[serde(default)]
    pub fee_override: Option<Money>,
    #[serde(default)]
    pub minimum_order_override: Option<Money>,
    #[serde(default)]
    pub eta_min_override: Option<i64>,
    #[serde(default)]
    pub eta_max_override: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// PUT `/zones/{id}`
async fn update_zone(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateZoneRequest>,
) -> ApiResult<Json<DeliveryZone>> {
    let mut zone = state
        .db
        .zones()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Zone", &id))?;

    zone.name = req.name;
    zone.fee_override = req.fee_override;
    zone.minimum_order_override = req.minimum_order_override;
    zone.eta_min_override = req.eta_min_override;
    zone.eta_max_override = req.eta_max_override;
    zone.is_active = req.is_active;

    let updated = state.db.zones().update(&zone).await?;
    Ok(Json(updated))
}

/// DELETE `/zones/{id}`
async fn delete_zone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.zones().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/zones/defaults` - Establishment fee rule, minimum order and ETA.
async fn get_defaults(State(state): State<AppState>) -> ApiResult<Json<EstablishmentDefaults>> {
    Ok(Json(state.db.zones().get_defaults().await?))
}

/// PUT `/zones/defaults`
async fn save_defaults(
    State(state): State<AppState>,
    Json(defaults): Json<EstablishmentDefaults>,
) -> ApiResult<Json<EstablishmentDefaults>> {
    state.db.zones().save_defaults(&defaults).await?;
    info!("Establishment defaults updated from admin");
    Ok(Json(defaults))
}
