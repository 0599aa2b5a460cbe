//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod cash;
pub mod delivery;
pub mod geocode;
pub mod health;
pub mod orders;
pub mod zones;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(delivery::routes())
        .merge(geocode::routes())
        .merge(zones::routes())
        .merge(orders::routes())
        .merge(cash::routes())
}
