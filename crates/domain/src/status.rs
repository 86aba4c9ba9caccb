//! Order status state machine.

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// The status of an order in its saga lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► StockReserved ──┬──► Completed
///           │                    │
///           └────────────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order created, no stock reserved yet.
    #[default]
    Pending,

    /// Stock has been reserved, awaiting payment.
    StockReserved,

    /// Payment succeeded, reservation retained (terminal state).
    Completed,

    /// Saga failed, any reservation released (terminal state).
    Failed,
}

impl OrderStatus {
    /// Returns true if this is a terminal state (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::StockReserved => "StockReserved",
            OrderStatus::Completed => "Completed",
            OrderStatus::Failed => "Failed",
        }
    }

    /// Applies a saga signal to this status.
    ///
    /// Returns `Transition::Changed` for a legal transition from the
    /// table, `Transition::NoOp` when the signal's target equals the
    /// current status (duplicate delivery of the same signal), and
    /// `OrderError::InvalidTransition` for everything else.
    ///
    /// The no-op case is what makes at-least-once delivery safe: a
    /// handler re-applying a signal it already applied observes success,
    /// not an error escalation.
    pub fn transition(self, signal: SagaSignal) -> Result<Transition, OrderError> {
        if self == signal.target() {
            return Ok(Transition::NoOp);
        }
        if self == signal.source() {
            return Ok(Transition::Changed {
                from: self,
                to: signal.target(),
            });
        }
        Err(OrderError::InvalidTransition { from: self, signal })
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A signal that advances the order state machine.
///
/// Each signal has exactly one legal source and target status, per the
/// transition table:
///
/// | From          | Signal             | To            |
/// |---------------|--------------------|---------------|
/// | Pending       | StockReserveOk     | StockReserved |
/// | Pending       | StockReserveFailed | Failed        |
/// | StockReserved | PaymentSucceeded   | Completed     |
/// | StockReserved | PaymentFailed      | Failed        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SagaSignal {
    /// Stock was reserved for the order.
    StockReserveOk,

    /// Stock could not be reserved; nothing to compensate.
    StockReserveFailed,

    /// Payment went through; the reservation is kept.
    PaymentSucceeded,

    /// Payment was declined; the reservation must be released.
    PaymentFailed,
}

impl SagaSignal {
    /// The status this signal is legal from.
    pub fn source(&self) -> OrderStatus {
        match self {
            SagaSignal::StockReserveOk | SagaSignal::StockReserveFailed => OrderStatus::Pending,
            SagaSignal::PaymentSucceeded | SagaSignal::PaymentFailed => OrderStatus::StockReserved,
        }
    }

    /// The status this signal moves the order to.
    pub fn target(&self) -> OrderStatus {
        match self {
            SagaSignal::StockReserveOk => OrderStatus::StockReserved,
            SagaSignal::PaymentSucceeded => OrderStatus::Completed,
            SagaSignal::StockReserveFailed | SagaSignal::PaymentFailed => OrderStatus::Failed,
        }
    }

    /// Returns the signal name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaSignal::StockReserveOk => "StockReserveOk",
            SagaSignal::StockReserveFailed => "StockReserveFailed",
            SagaSignal::PaymentSucceeded => "PaymentSucceeded",
            SagaSignal::PaymentFailed => "PaymentFailed",
        }
    }
}

impl std::fmt::Display for SagaSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of applying a signal to an order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status changed.
    Changed { from: OrderStatus, to: OrderStatus },

    /// The order was already in the signal's target status.
    NoOp,
}

impl Transition {
    /// Returns true if the status actually changed.
    pub fn changed(&self) -> bool {
        matches!(self, Transition::Changed { .. })
    }
}
