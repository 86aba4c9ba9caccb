//! Saga error taxonomy.

use std::time::Duration;

use common::OrderId;
use domain::OrderError;
use event_bus::BusError;
use thiserror::Error;

/// Errors that can occur while driving a saga.
///
/// Duplicate deliveries and duplicate calls are deliberately *not*
/// errors — they surface as `AlreadyReserved`/`AlreadyReleased` outcomes
/// or state-machine no-ops and are swallowed by the idempotency layer.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Temporary unavailability; safe to retry with backoff.
    #[error("transient failure during {operation}: {reason}")]
    Transient {
        operation: &'static str,
        reason: String,
    },

    /// Explicit business rejection (e.g. insufficient stock). Triggers
    /// compensation where anything was already reserved; never retried.
    #[error("rejected: {0}")]
    Rejected(String),

    /// An external call exceeded its bounded timeout.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The compensating release could not be completed after exhausting
    /// retries. The order is left in `StockReserved` pending manual
    /// reconciliation; this is the one condition the orchestrator cannot
    /// resolve on its own.
    #[error("compensation failed for order {order_id} after {attempts} attempts: {reason}")]
    CompensationFailure {
        order_id: OrderId,
        attempts: u32,
        reason: String,
    },

    /// Order error (invalid transition or unknown order).
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// Event bus error.
    #[error("event bus error: {0}")]
    Bus(#[from] BusError),
}

impl SagaError {
    /// Returns true if the error is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SagaError::Transient { .. } | SagaError::Timeout { .. }
        )
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
