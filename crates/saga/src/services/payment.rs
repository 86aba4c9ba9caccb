//! Payment gateway trait and configurable stub.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{AttemptId, OrderId};

use crate::error::SagaError;

/// Business outcome of a payment attempt.
///
/// A decline is a normal outcome, not an error: the gateway answered
/// and the answer was no. Errors are reserved for the gateway not
/// answering at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The charge went through.
    Success,
    /// The charge was declined.
    Failure,
}

/// Record of one payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentAttempt {
    /// Unique ID assigned by the gateway.
    pub attempt_id: AttemptId,
    /// The order being charged.
    pub order_id: OrderId,
    /// Whether the charge succeeded.
    pub outcome: PaymentOutcome,
}

/// Trait for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempts to charge the given amount for an order.
    async fn attempt(&self, order_id: OrderId, amount: u64) -> Result<PaymentAttempt, SagaError>;
}

/// Configured behavior of the stub gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentBehavior {
    /// Every charge succeeds.
    #[default]
    Succeed,
    /// Every charge is declined.
    Fail,
    /// The gateway is unreachable; calls fail transiently.
    Unavailable,
}

#[derive(Debug, Default)]
struct GatewayState {
    behavior: PaymentBehavior,
    attempts: Vec<PaymentAttempt>,
}

/// In-memory payment gateway with a configurable answer.
#[derive(Debug, Clone, Default)]
pub struct StubPaymentGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl StubPaymentGateway {
    /// Creates a gateway that approves every charge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway with the given behavior.
    pub fn with_behavior(behavior: PaymentBehavior) -> Self {
        let gateway = Self::default();
        gateway.set_behavior(behavior);
        gateway
    }

    /// Changes how the gateway answers subsequent attempts.
    pub fn set_behavior(&self, behavior: PaymentBehavior) {
        self.state.write().unwrap().behavior = behavior;
    }

    /// Returns the number of attempts made so far.
    pub fn attempt_count(&self) -> usize {
        self.state.read().unwrap().attempts.len()
    }

    /// Returns a copy of the attempt log.
    pub fn attempts(&self) -> Vec<PaymentAttempt> {
        self.state.read().unwrap().attempts.clone()
    }
}

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    async fn attempt(&self, order_id: OrderId, amount: u64) -> Result<PaymentAttempt, SagaError> {
        let mut state = self.state.write().unwrap();

        let outcome = match state.behavior {
            PaymentBehavior::Succeed => PaymentOutcome::Success,
            PaymentBehavior::Fail => PaymentOutcome::Failure,
            PaymentBehavior::Unavailable => {
                return Err(SagaError::Transient {
                    operation: "payment",
                    reason: "payment gateway unavailable".to_string(),
                });
            }
        };

        let attempt = PaymentAttempt {
            attempt_id: AttemptId::new(),
            order_id,
            outcome,
        };
        tracing::debug!(%order_id, amount, ?outcome, "payment attempt");
        state.attempts.push(attempt);

        Ok(attempt)
    }
}
