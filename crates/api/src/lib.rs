//! Edge gateway for the car-rental services.
//!
//! Exposes the public REST API, delegates to the rental coordinator and
//! serves Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::RentalCoordinator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: RentalCoordinator,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/cars", get(routes::cars::list))
        .route(
            "/rental",
            get(routes::rentals::list).post(routes::rentals::book),
        )
        .route(
            "/rental/{rental_uid}",
            get(routes::rentals::get).delete(routes::rentals::cancel),
        )
        .route("/rental/{rental_uid}/finish", post(routes::rentals::finish));

    Router::new()
        .route("/manage/health", get(routes::health::check))
        .nest("/api/v1", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
