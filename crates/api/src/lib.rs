//! HTTP API server for the saga transaction core.
//!
//! Exposes order creation and polling over REST in either saga mode,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::OrderStore;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{Choreographer, InMemoryReservationStore, Orchestrator, StubPaymentGateway};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::SagaMode;
use routes::orders::{AppState, SagaDriver};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/create_order", post(routes::orders::create))
        .route("/order/{id}", get(routes::orders::get))
        .route("/inventory/{product_id}", get(routes::orders::inventory))
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

/// Creates application state with in-memory services and the driver for
/// the given mode. Choreographed mode starts its handler tasks here.
pub fn create_default_state(mode: SagaMode) -> Result<Arc<AppState>, saga::SagaError> {
    let orders = OrderStore::new();
    let reservations = InMemoryReservationStore::new();
    let payments = StubPaymentGateway::new();

    let driver = match mode {
        SagaMode::Orchestrated => SagaDriver::Orchestrated(Orchestrator::new(
            orders.clone(),
            reservations.clone(),
            payments,
        )),
        SagaMode::Choreographed => {
            let mut choreographer =
                Choreographer::new(orders.clone(), reservations.clone(), payments)?;
            choreographer.start()?;
            SagaDriver::Choreographed(choreographer)
        }
    };

    Ok(Arc::new(AppState {
        driver,
        orders,
        reservations,
    }))
}
