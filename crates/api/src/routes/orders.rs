//! Order creation and polling endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, ProductId};
use domain::OrderStore;
use saga::{
    Choreographer, InMemoryReservationStore, Orchestrator, ReservationStore, StubPaymentGateway,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub type AppOrchestrator = Orchestrator<InMemoryReservationStore, StubPaymentGateway>;
pub type AppChoreographer = Choreographer<InMemoryReservationStore, StubPaymentGateway>;

/// The saga driver the server was started with.
pub enum SagaDriver {
    Orchestrated(AppOrchestrator),
    Choreographed(AppChoreographer),
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub driver: SagaDriver,
    pub orders: OrderStore,
    pub reservations: InMemoryReservationStore,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: u64,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderStatusResponse {
    pub order_id: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct InventoryResponse {
    pub product_id: u64,
    pub reserved: u32,
}

// -- Handlers --

/// POST /create_order — runs the saga for a new order.
///
/// Orchestrated mode blocks until the order reaches a terminal state and
/// returns `200`; choreographed mode publishes `OrderCreated` and
/// returns `202` with a `Pending` status for the client to poll.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderStatusResponse>), ApiError> {
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("quantity must be at least 1".to_string()));
    }
    let product_id = ProductId::new(req.product_id);

    let (status_code, receipt) = match &state.driver {
        SagaDriver::Orchestrated(orchestrator) => (
            StatusCode::OK,
            orchestrator.create_order(product_id, req.quantity).await?,
        ),
        SagaDriver::Choreographed(choreographer) => (
            StatusCode::ACCEPTED,
            choreographer.create_order(product_id, req.quantity)?,
        ),
    };

    Ok((
        status_code,
        Json(OrderStatusResponse {
            order_id: receipt.order_id.to_string(),
            status: receipt.status.as_str().to_string(),
        }),
    ))
}

/// GET /order/{id} — poll an order's current status.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let uuid = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    let order_id = OrderId::from_uuid(uuid);

    let status = state
        .orders
        .status(order_id)
        .ok_or_else(|| ApiError::NotFound(format!("order {order_id} not found")))?;

    Ok(Json(OrderStatusResponse {
        order_id: order_id.to_string(),
        status: status.as_str().to_string(),
    }))
}

/// GET /inventory/{product_id} — current reserved quantity for a product.
#[tracing::instrument(skip(state))]
pub async fn inventory(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<u64>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let reserved = state
        .reservations
        .reserved(ProductId::new(product_id))
        .await?;
    Ok(Json(InventoryResponse {
        product_id,
        reserved,
    }))
}
