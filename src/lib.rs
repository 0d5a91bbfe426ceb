//! REST backend for booking massage shop appointments.
//!
//! Shops keep a per-date book of busy time ranges (see [`scheduling`]);
//! reservations are only stored after their range passes the overlap check
//! against that book.

pub mod auth;
pub mod config;
pub mod database;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scheduling;
pub mod services;
pub mod state;
pub mod store;

use axum::{routing::get, Router};
use http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Full application router with state attached.
pub fn app(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();

    let app = Router::new()
        .nest("/api/v1", routes::create_router(&state))
        .route("/health", get(health_check))
        .with_state(state);

    match cors_origins {
        Some(origins) => app.layer(cors_layer(&origins)),
        None => app,
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

async fn health_check() -> &'static str {
    "OK"
}
