//! Rutas HTTP
//!
//! Un router por recurso, montados bajo `/api` detrás del middleware de
//! autenticación. `/health` queda público.

pub mod driver_routes;
pub mod match_routes;
pub mod pricing_config_routes;
pub mod ride_request_routes;
pub mod ride_routes;

use axum::{middleware, response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_middleware, cors_middleware_with_origins};
use crate::state::AppState;

/// Router completo de la aplicación
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .nest("/ride-requests", ride_request_routes::create_ride_request_router())
        .nest("/offers", ride_request_routes::create_offer_router())
        .nest("/matches", match_routes::create_match_router())
        .nest("/rides", ride_routes::create_ride_router())
        .nest("/pricing-configs", pricing_config_routes::create_pricing_config_router())
        .nest("/drivers", driver_routes::create_driver_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_middleware_with_origins(&state.config.cors_origins))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
