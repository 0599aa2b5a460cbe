//! Order endpoints.
//!
//! ## Order Creation
//! ```text
//! NewOrder ──► validate
//!     │
//!     ├── delivery? ── zone terms ── minimum order ── fee (tiered or flat)
//!     │
//!     ├── OrderTotals::compute(items, fee, discount)
//!     ├── change_due(total, change_for)
//!     ├── ETA (routing / heuristic, floored by zone times)
//!     │
//!     └── OrderRepository::create ──► #0042 pending (or waiting_payment)
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use entrega_core::order::{change_due, display_number};
use entrega_core::{
    FeePolicy, Money, NewOrder, Order, OrderItem, OrderStatus, OrderTotals, OrderType,
    ValidationError,
};
use entrega_db::CreateOrder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::routes::delivery::{estimate_for, load_terms};
use crate::AppState;

/// Creates the order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/advance", post(advance_order))
        .route("/orders/{id}/cancel", post(cancel_order))
}

/// An order with its items, as the panels show it.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// `#0042`
    pub display_number: String,
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderResponse {
    fn new(order: Order, items: Vec<OrderItem>) -> Self {
        OrderResponse {
            display_number: display_number(order.number),
            order,
            items,
        }
    }
}

/// POST `/orders` - Price and store a new order.
async fn create_order(
    State(state): State<AppState>,
    Json(new): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    new.validate()?;
    let placed_at = Utc::now();

    let is_delivery = new.order_type == OrderType::Delivery;
    let terms = load_terms(&state, new.zone_id.as_deref().filter(|_| is_delivery)).await?;

    let delivery_fee = if is_delivery {
        let subtotal = new.subtotal()?;
        terms.check_minimum_order(subtotal)?;

        match (&new.coordinates, &terms.fee_policy) {
            (Some(destination), _) => {
                terms
                    .quote(&state.config.establishment.origin, destination, Some(subtotal))?
                    .fee
            }
            (None, FeePolicy::Flat { fee }) => *fee,
            (None, FeePolicy::Tiered { .. }) => {
                return Err(ValidationError::required("coordinates").into())
            }
        }
    } else {
        Money::zero()
    };

    let totals = OrderTotals::compute(&new.items, delivery_fee, new.discount)?;
    let change = change_due(totals.total, new.change_for)?;

    let eta = estimate_for(
        &state,
        new.order_type,
        new.coordinates.as_ref(),
        &terms,
        placed_at,
    )
    .await?;

    let order = state
        .db
        .orders()
        .create(CreateOrder {
            order: &new,
            totals,
            change_due: change,
            eta_min_minutes: Some(eta.total_min_minutes),
            eta_max_minutes: Some(eta.total_max_minutes),
        })
        .await?;
    let items = state.db.orders().get_items(&order.id).await?;

    info!(
        number = %display_number(order.number),
        order_type = ?order.order_type,
        eta_source = ?eta.source,
        "Order placed"
    );

    Ok((StatusCode::CREATED, Json(OrderResponse::new(order, items))))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    /// Only this status; otherwise every active (non-terminal) order.
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// GET `/orders` - Kitchen and motoboy panel feed.
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let orders = match query.status {
        Some(status) => state.db.orders().list_by_status(status).await?,
        None => state.db.orders().list_active().await?,
    };
    Ok(Json(orders))
}

/// GET `/orders/{id}`
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state.db.orders().require(&id).await?;
    let items = state.db.orders().get_items(&id).await?;
    Ok(Json(OrderResponse::new(order, items)))
}

/// POST `/orders/{id}/advance` - Move to the next status.
async fn advance_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    let order = state.db.orders().advance(&id).await?;
    Ok(Json(order))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST `/orders/{id}/cancel`
async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<Json<Order>> {
    let reason = req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let order = state.db.orders().cancel(&id, reason).await?;
    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{send, state};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    fn delivery_order() -> Value {
        json!({
            "customer_name": "Ana Paula",
            "customer_phone": "(11) 98765-4321",
            "order_type": "delivery",
            "address": "Rua Cardeal Arcoverde, 1200",
            "coordinates": { "lat": -23.5750, "lng": -46.6850 },
            "items": [
                { "product_id": "pizza-calabresa", "name": "Pizza Calabresa", "quantity": 1, "unit_price": 5290 },
                { "product_id": "guarana-2l", "name": "Guaraná 2L", "quantity": 2, "unit_price": 1290 }
            ],
            "payment_method": "cash",
            "change_for": 10000
        })
    }

    #[tokio::test]
    async fn test_create_delivery_order() {
        let state = state().await;
        let (status, body) = send(&state, "POST", "/api/v1/orders", Some(delivery_order())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["display_number"], "#0001");
        let order = &body["order"];
        assert_eq!(order["status"], "pending");
        assert_eq!(order["subtotal"], 7870);
        assert_eq!(order["delivery_fee"], 500);
        assert_eq!(order["total"], 8370);
        assert_eq!(order["change_due"], 1630);
        let eta_min = order["eta_min_minutes"].as_i64().unwrap();
        assert!(order["eta_max_minutes"].as_i64().unwrap() >= eta_min);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);

        let id = order["id"].as_str().unwrap();
        let (status, fetched) = send(&state, "GET", &format!("/api/v1/orders/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["order"]["number"], 1);
    }

    #[tokio::test]
    async fn test_online_payment_waits() {
        let state = state().await;
        let mut order = delivery_order();
        order["payment_method"] = json!("online");
        order["change_for"] = Value::Null;
        let (status, body) = send(&state, "POST", "/api/v1/orders", Some(order)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["order"]["status"], "waiting_payment");
    }

    #[tokio::test]
    async fn test_rejections() {
        let state = state().await;

        let mut below = delivery_order();
        below["items"] = json!([{ "product_id": "esfiha", "name": "Esfiha", "quantity": 1, "unit_price": 690 }]);
        below["change_for"] = Value::Null;
        let (status, body) = send(&state, "POST", "/api/v1/orders", Some(below)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "BELOW_MINIMUM_ORDER");

        let mut short_change = delivery_order();
        short_change["change_for"] = json!(5000);
        let (status, _) = send(&state, "POST", "/api/v1/orders", Some(short_change)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut no_coords = delivery_order();
        no_coords["coordinates"] = Value::Null;
        let (status, body) = send(&state, "POST", "/api/v1/orders", Some(no_coords)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "coordinates is required");

        // Nothing was stored
        let (_, active) = send(&state, "GET", "/api/v1/orders", None).await;
        assert!(active.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_prices_are_rejected() {
        let state = state().await;

        let mut order = delivery_order();
        order["items"] = json!([{
            "product_id": "pizza",
            "name": "Pizza",
            "quantity": 2,
            "unit_price": 5_000_000_000_000_000_000i64
        }]);
        order["change_for"] = Value::Null;
        let (status, body) = send(&state, "POST", "/api/v1/orders", Some(order)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let mut order = delivery_order();
        order["discount"] = json!(i64::MAX);
        let (status, _) = send(&state, "POST", "/api/v1/orders", Some(order)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_flat_zone_order_without_coordinates() {
        let state = state().await;
        let (status, zone) = send(
            &state,
            "POST",
            "/api/v1/zones",
            Some(json!({ "name": "Centro", "fee_override": 700 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let mut order = delivery_order();
        order["coordinates"] = Value::Null;
        order["zone_id"] = zone["id"].clone();
        let (status, body) = send(&state, "POST", "/api/v1/orders", Some(order)).await;

        assert_eq!(status, StatusCode::CREATED);
        let order = &body["order"];
        assert_eq!(order["delivery_fee"], 700);
        assert_eq!(order["total"], 8570);
        // No travel leg; at least the advertised default window
        assert!(order["eta_min_minutes"].as_i64().unwrap() >= 30);
        assert!(order["eta_max_minutes"].as_i64().unwrap() >= 50);
    }

    #[tokio::test]
    async fn test_pickup_lifecycle() {
        let state = state().await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/orders",
            Some(json!({
                "customer_name": "Bruno Lima",
                "order_type": "pickup",
                "items": [{ "product_id": "esfiha", "name": "Esfiha", "quantity": 3, "unit_price": 690 }],
                "payment_method": "pix"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["order"]["delivery_fee"], 0);
        let id = body["order"]["id"].as_str().unwrap().to_string();

        let advance = format!("/api/v1/orders/{}/advance", id);
        for expected in ["confirmed", "preparing", "ready", "delivered"] {
            let (status, order) = send(&state, "POST", &advance, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(order["status"], expected);
        }

        let (status, err) = send(&state, "POST", &advance, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["code"], "BUSINESS_LOGIC");

        let (_, delivered) = send(&state, "GET", "/api/v1/orders?status=delivered", None).await;
        assert_eq!(delivered.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let state = state().await;
        let (_, first) = send(&state, "POST", "/api/v1/orders", Some(delivery_order())).await;
        let (_, second) = send(&state, "POST", "/api/v1/orders", Some(delivery_order())).await;
        assert_eq!(second["order"]["number"], 2);

        let first_id = first["order"]["id"].as_str().unwrap().to_string();
        let (status, cancelled) = send(
            &state,
            "POST",
            &format!("/api/v1/orders/{}/cancel", first_id),
            Some(json!({ "reason": "Cliente desistiu" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["status"], "cancelled");
        assert_eq!(cancelled["cancel_reason"], "Cliente desistiu");

        // pending → confirmed → preparing → ready → out_for_delivery
        let second_id = second["order"]["id"].as_str().unwrap().to_string();
        for _ in 0..4 {
            state.db.orders().advance(&second_id).await.unwrap();
        }
        let (status, _) = send(
            &state,
            "POST",
            &format!("/api/v1/orders/{}/cancel", second_id),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let state = state().await;
        let (status, _) = send(&state, "GET", "/api/v1/orders/does-not-exist", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
