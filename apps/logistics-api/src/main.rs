//! Entrega Logistics API - Main Entry Point
//!
//! Starts the HTTP server for fee quotes, ETA, geocoding, orders and the
//! cash register.
//!
//! ```bash
//! ENTREGA_CONFIG=./logistics.toml RUST_LOG=debug cargo run -p logistics-api
//! ```

use std::sync::Arc;

use entrega_db::{Database, DbConfig};
use logistics_api::config::ApiConfig;
use logistics_api::providers::{GeocodingClient, RoutingClient};
use logistics_api::{create_router, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Entrega Logistics API...");

    let config = ApiConfig::load(None)?;
    info!(
        establishment = %config.establishment.name,
        lat = config.establishment.origin.lat,
        lng = config.establishment.origin.lng,
        routing = config.routing.enabled,
        geocoding = config.geocoding.enabled,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await?;
    info!("Database connection established");

    let routing = RoutingClient::new(&config.routing, &config.geocoding.user_agent)?;
    let geocoder = GeocodingClient::new(&config.geocoding)?;

    let addr = config.bind_address();
    let state = AppState::new(db.clone(), config, Arc::new(routing), Arc::new(geocoder));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Logistics API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Sets up logging with `RUST_LOG` support.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,entrega=debug,logistics_api=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
