//! Order entity.

use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::status::{OrderStatus, SagaSignal, Transition};

/// An order moving through the saga.
///
/// Owned exclusively by the saga driver that created it; mutated only
/// through [`Order::apply`], never deleted. Once a terminal status is
/// reached the entity stays in the store for polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    product_id: ProductId,
    quantity: u32,
    status: OrderStatus,
}

impl Order {
    /// Creates a new order in `Pending`.
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            id: OrderId::new(),
            product_id,
            quantity,
            status: OrderStatus::Pending,
        }
    }

    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the product this order is for.
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Returns the ordered quantity.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies a saga signal, advancing the status if the transition is
    /// legal. Duplicate signals are no-ops; illegal ones leave the order
    /// untouched and return `OrderError::InvalidTransition`.
    pub fn apply(&mut self, signal: SagaSignal) -> Result<Transition, OrderError> {
        let transition = self.status.transition(signal)?;
        if let Transition::Changed { to, .. } = transition {
            self.status = to;
        }
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_is_pending() {
        let order = Order::new(ProductId::new(1), 2);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.product_id(), ProductId::new(1));
        assert_eq!(order.quantity(), 2);
        assert!(!order.is_terminal());
    }

    #[test]
    fn test_happy_path_sequence() {
        let mut order = Order::new(ProductId::new(1), 1);

        assert!(order.apply(SagaSignal::StockReserveOk).unwrap().changed());
        assert_eq!(order.status(), OrderStatus::StockReserved);

        assert!(order.apply(SagaSignal::PaymentSucceeded).unwrap().changed());
        assert_eq!(order.status(), OrderStatus::Completed);
        assert!(order.is_terminal());
    }

    #[test]
    fn test_compensation_sequence() {
        let mut order = Order::new(ProductId::new(1), 1);

        order.apply(SagaSignal::StockReserveOk).unwrap();
        order.apply(SagaSignal::PaymentFailed).unwrap();
        assert_eq!(order.status(), OrderStatus::Failed);
    }

    #[test]
    fn test_duplicate_apply_leaves_status_unchanged() {
        let mut order = Order::new(ProductId::new(1), 1);
        order.apply(SagaSignal::StockReserveOk).unwrap();
        order.apply(SagaSignal::PaymentFailed).unwrap();

        let second = order.apply(SagaSignal::PaymentFailed).unwrap();
        assert_eq!(second, Transition::NoOp);
        assert_eq!(order.status(), OrderStatus::Failed);
    }

    #[test]
    fn test_illegal_apply_does_not_mutate() {
        let mut order = Order::new(ProductId::new(1), 1);
        assert!(order.apply(SagaSignal::PaymentSucceeded).is_err());
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let order = Order::new(ProductId::new(7), 3);
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.id(), order.id());
        assert_eq!(deserialized.status(), order.status());
    }
}
