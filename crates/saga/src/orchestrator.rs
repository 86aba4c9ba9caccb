//! Orchestrated (blocking) saga execution.
//!
//! One coordinator owns the whole transaction: it calls the reservation
//! store and the payment gateway sequentially within the request, applies
//! the resulting signals to the order, and performs the compensating
//! release itself when payment fails. Every external call is bounded by
//! the policy timeout; only the compensating release is retried.

use std::future::Future;

use common::{OrderId, ProductId};
use domain::{Order, OrderStatus, OrderStore, SagaSignal};

use crate::error::SagaError;
use crate::policy::RetryPolicy;
use crate::services::{PaymentGateway, PaymentOutcome, ReservationStore};

/// Flat per-unit charge; quantity times this is the payment amount.
/// The amount is widened to `u64` so no quantity the API accepts can
/// overflow the multiplication.
pub const UNIT_PRICE: u64 = 100;

/// What the caller gets back from a completed saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Single-coordinator saga driver.
pub struct Orchestrator<R, P> {
    orders: OrderStore,
    reservations: R,
    payments: P,
    policy: RetryPolicy,
}

impl<R, P> Orchestrator<R, P>
where
    R: ReservationStore,
    P: PaymentGateway,
{
    /// Creates an orchestrator with the default retry policy.
    pub fn new(orders: OrderStore, reservations: R, payments: P) -> Self {
        Self::with_policy(orders, reservations, payments, RetryPolicy::default())
    }

    /// Creates an orchestrator with an explicit retry policy.
    pub fn with_policy(
        orders: OrderStore,
        reservations: R,
        payments: P,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            orders,
            reservations,
            payments,
            policy,
        }
    }

    /// Returns the shared order store.
    pub fn orders(&self) -> &OrderStore {
        &self.orders
    }

    /// Runs the full saga for a new order and returns its terminal
    /// status.
    ///
    /// The only error a caller sees for a *business* failure is none at
    /// all: rejected stock and declined payment both come back as
    /// `Ok` with a `Failed` receipt. `Err` means the saga itself broke,
    /// most importantly [`SagaError::CompensationFailure`], which leaves
    /// the order in `StockReserved` for manual reconciliation.
    #[tracing::instrument(skip(self), fields(order_id))]
    pub async fn create_order(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<OrderReceipt, SagaError> {
        let order = Order::new(product_id, quantity);
        let order_id = order.id();
        tracing::Span::current().record("order_id", tracing::field::display(order_id));
        self.orders.insert(order);
        metrics::counter!("saga_orders_total", "mode" => "orchestrated").increment(1);

        match self
            .timed(
                "reserve",
                self.reservations.reserve(product_id, quantity, order_id),
            )
            .await
        {
            Ok(_) => {
                self.orders.apply(order_id, SagaSignal::StockReserveOk)?;
            }
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "stock reservation failed");
                self.orders.apply(order_id, SagaSignal::StockReserveFailed)?;
                metrics::counter!("saga_orders_failed_total", "mode" => "orchestrated")
                    .increment(1);
                return Ok(OrderReceipt {
                    order_id,
                    status: OrderStatus::Failed,
                });
            }
        }

        let payment = self
            .timed(
                "payment",
                self.payments
                    .attempt(order_id, u64::from(quantity) * UNIT_PRICE),
            )
            .await;

        match payment {
            Ok(attempt) if attempt.outcome == PaymentOutcome::Success => {
                self.orders.apply(order_id, SagaSignal::PaymentSucceeded)?;
                metrics::counter!("saga_orders_completed_total", "mode" => "orchestrated")
                    .increment(1);
                tracing::info!(%order_id, attempt_id = %attempt.attempt_id, "order completed");
                Ok(OrderReceipt {
                    order_id,
                    status: OrderStatus::Completed,
                })
            }
            Ok(attempt) => {
                tracing::warn!(%order_id, attempt_id = %attempt.attempt_id, "payment declined");
                self.fail_with_compensation(order_id).await
            }
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "payment call failed");
                self.fail_with_compensation(order_id).await
            }
        }
    }

    /// Releases the reservation, then moves the order to `Failed`.
    ///
    /// Runs only after the reservation step succeeded, so there is
    /// always something to undo. If compensation exhausts its retries
    /// the error propagates and the order stays in `StockReserved`.
    async fn fail_with_compensation(&self, order_id: OrderId) -> Result<OrderReceipt, SagaError> {
        self.compensate(order_id).await?;
        self.orders.apply(order_id, SagaSignal::PaymentFailed)?;
        metrics::counter!("saga_orders_failed_total", "mode" => "orchestrated").increment(1);
        Ok(OrderReceipt {
            order_id,
            status: OrderStatus::Failed,
        })
    }

    /// Compensating release with bounded retry and exponential backoff.
    async fn compensate(&self, order_id: OrderId) -> Result<(), SagaError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .timed("release", self.reservations.release(order_id))
                .await
            {
                Ok(outcome) => {
                    tracing::info!(%order_id, attempt, ?outcome, "reservation released");
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    tracing::warn!(%order_id, attempt, error = %err, "release failed, retrying");
                    metrics::counter!("saga_compensation_retries_total").increment(1);
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                }
                Err(err) => {
                    tracing::error!(%order_id, attempt, error = %err, "compensation failed");
                    metrics::counter!("saga_compensation_failures_total").increment(1);
                    return Err(SagaError::CompensationFailure {
                        order_id,
                        attempts: attempt,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    async fn timed<T, F>(&self, operation: &'static str, call: F) -> Result<T, SagaError>
    where
        F: Future<Output = Result<T, SagaError>>,
    {
        match tokio::time::timeout(self.policy.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SagaError::Timeout {
                operation,
                timeout: self.policy.call_timeout,
            }),
        }
    }
}
