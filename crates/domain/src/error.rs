//! Domain error types.

use common::OrderId;
use thiserror::Error;

use crate::status::{OrderStatus, SagaSignal};

/// Errors that can occur when mutating an order.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OrderError {
    /// The requested transition is not in the state machine table.
    #[error("invalid transition: {signal} is not legal from {from}")]
    InvalidTransition {
        from: OrderStatus,
        signal: SagaSignal,
    },

    /// No order with the given ID exists.
    #[error("order not found: {0}")]
    NotFound(OrderId),
}
