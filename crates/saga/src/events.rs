//! Saga events for the choreographed mode.

use chrono::{DateTime, Utc};
use common::{AttemptId, EventId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

/// Envelope carried by every saga event.
///
/// `event_id` is the consumer-side deduplication key; `order_id` is the
/// partition key that orders related events on a queue. Events are
/// immutable once published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaEvent {
    /// Unique per published event, for deduplication.
    pub event_id: EventId,
    /// The order this event belongs to (partition key).
    pub order_id: OrderId,
    /// When the event was published.
    pub occurred_at: DateTime<Utc>,
    /// The typed payload.
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Closed set of saga event payloads.
///
/// Dispatched by a single exhaustive match in each handler; there is no
/// structural inspection of dynamic payloads anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventPayload {
    /// An order was created and the saga should begin.
    OrderCreated { product_id: ProductId, quantity: u32 },

    /// Stock was reserved for the order.
    StockReserved,

    /// Stock could not be reserved; the saga ends without compensation.
    StockReserveFailed { reason: String },

    /// Payment went through; the order can complete.
    PaymentSucceeded { attempt_id: AttemptId },

    /// Payment was declined; broadcast so every participant compensates.
    PaymentFailed { reason: String },
}

impl SagaEvent {
    fn emit(order_id: OrderId, payload: EventPayload) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            occurred_at: Utc::now(),
            payload,
        }
    }

    /// Creates an `OrderCreated` event.
    pub fn order_created(order_id: OrderId, product_id: ProductId, quantity: u32) -> Self {
        Self::emit(
            order_id,
            EventPayload::OrderCreated {
                product_id,
                quantity,
            },
        )
    }

    /// Creates a `StockReserved` event.
    pub fn stock_reserved(order_id: OrderId) -> Self {
        Self::emit(order_id, EventPayload::StockReserved)
    }

    /// Creates a `StockReserveFailed` event.
    pub fn stock_reserve_failed(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self::emit(
            order_id,
            EventPayload::StockReserveFailed {
                reason: reason.into(),
            },
        )
    }

    /// Creates a `PaymentSucceeded` event.
    pub fn payment_succeeded(order_id: OrderId, attempt_id: AttemptId) -> Self {
        Self::emit(order_id, EventPayload::PaymentSucceeded { attempt_id })
    }

    /// Creates a `PaymentFailed` event.
    pub fn payment_failed(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self::emit(
            order_id,
            EventPayload::PaymentFailed {
                reason: reason.into(),
            },
        )
    }

    /// Returns the event type name as it appears on the wire.
    pub fn event_type(&self) -> &'static str {
        match self.payload {
            EventPayload::OrderCreated { .. } => "OrderCreated",
            EventPayload::StockReserved => "StockReserved",
            EventPayload::StockReserveFailed { .. } => "StockReserveFailed",
            EventPayload::PaymentSucceeded { .. } => "PaymentSucceeded",
            EventPayload::PaymentFailed { .. } => "PaymentFailed",
        }
    }
}
