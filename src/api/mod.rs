//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{http::HeaderName, middleware as axum_middleware, routing::get, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::notify::PurchaseNotifier;
use crate::payment::PaymentGateway;
use crate::storage::LedgerStore;

pub use routes::{create_router, payment_router};

/// Shared state for every route
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub notifier: PurchaseNotifier,
    pub payments: PaymentGateway,
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Layers run last-added first: logging sees the context identity attached
    let api_routes = create_router()
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::identity_middleware));

    let payment_routes = payment_router()
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    let correlation = HeaderName::from_static("x-correlation-id");

    Router::new()
        // Health check (no identity)
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .nest("/payments", payment_routes)
        .layer(TraceLayer::new_for_http())
        // Outermost: every request carries a correlation id, echoed on the response
        .layer(PropagateRequestIdLayer::new(correlation.clone()))
        .layer(SetRequestIdLayer::new(correlation, MakeRequestUuid))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
