//! Shared in-memory order store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use common::OrderId;

use crate::error::OrderError;
use crate::order::Order;
use crate::status::{OrderStatus, SagaSignal, Transition};

/// In-memory order store shared between a saga driver and the read side.
///
/// All mutation goes through [`OrderStore::apply`], which holds the lock
/// for the whole read-modify-write so concurrent handlers for the same
/// order serialize on the transition table.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    inner: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl OrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a freshly created order.
    pub fn insert(&self, order: Order) {
        self.inner.write().unwrap().insert(order.id(), order);
    }

    /// Returns a snapshot of the order, if it exists.
    pub fn get(&self, id: OrderId) -> Option<Order> {
        self.inner.read().unwrap().get(&id).cloned()
    }

    /// Returns the current status of the order, if it exists.
    pub fn status(&self, id: OrderId) -> Option<OrderStatus> {
        self.inner.read().unwrap().get(&id).map(Order::status)
    }

    /// Applies a saga signal to the stored order under the write lock.
    pub fn apply(&self, id: OrderId, signal: SagaSignal) -> Result<Transition, OrderError> {
        let mut orders = self.inner.write().unwrap();
        let order = orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;
        let transition = order.apply(signal)?;
        if let Transition::Changed { from, to } = transition {
            tracing::debug!(order_id = %id, %from, %to, "order transitioned");
        }
        Ok(transition)
    }

    /// Returns the number of stored orders.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// Returns true if no orders are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;

    #[test]
    fn test_insert_and_get() {
        let store = OrderStore::new();
        let order = Order::new(ProductId::new(1), 2);
        let id = order.id();

        store.insert(order);

        let loaded = store.get(id).unwrap();
        assert_eq!(loaded.id(), id);
        assert_eq!(store.status(id), Some(OrderStatus::Pending));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_apply_advances_stored_order() {
        let store = OrderStore::new();
        let order = Order::new(ProductId::new(1), 1);
        let id = order.id();
        store.insert(order);

        let t = store.apply(id, SagaSignal::StockReserveOk).unwrap();
        assert!(t.changed());
        assert_eq!(store.status(id), Some(OrderStatus::StockReserved));
    }

    #[test]
    fn test_apply_unknown_order() {
        let store = OrderStore::new();
        let result = store.apply(OrderId::new(), SagaSignal::StockReserveOk);
        assert!(matches!(result, Err(OrderError::NotFound(_))));
    }

    #[test]
    fn test_get_missing_order() {
        let store = OrderStore::new();
        assert!(store.get(OrderId::new()).is_none());
        assert!(store.is_empty());
    }
}
