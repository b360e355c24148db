//! HTTP API server with observability for the storefront checkout system.
//!
//! Provides REST endpoints for the catalog, carts, checkout and receipts,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod gate;
pub mod identity;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::DEFAULT_CODE_ATTEMPTS;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Storage;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Storage>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/items", get(routes::items::list::<S>))
        .route(
            "/items/{id}",
            get(routes::items::get::<S>).put(routes::items::put::<S>),
        )
        .route("/carts", post(routes::carts::create::<S>))
        .route(
            "/carts/{id}",
            get(routes::carts::get::<S>).delete(routes::carts::clear::<S>),
        )
        .route(
            "/carts/{id}/items/{item}",
            post(routes::carts::add_line::<S>)
                .put(routes::carts::update_line::<S>)
                .delete(routes::carts::remove_line::<S>),
        )
        .route("/carts/{id}/total", get(routes::carts::total::<S>))
        .route("/carts/{id}/purchase", post(routes::carts::purchase::<S>))
        .route("/receipts", get(routes::receipts::list::<S>))
        .route("/receipts/{id}", get(routes::receipts::get::<S>))
        .route("/receipts/code/{code}", get(routes::receipts::get_by_code::<S>))
        .route("/receipts/stats/sales", get(routes::receipts::sales_stats::<S>))
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

/// Creates the default application state over one storage backend.
pub fn create_default_state<S: Storage>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, DEFAULT_CODE_ATTEMPTS))
}
