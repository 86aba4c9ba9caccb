//! Reservation store trait and in-memory implementation.
//!
//! The store wraps raw increment/decrement in an idempotency layer keyed
//! by order ID: repeating a reserve or a release for the same order is a
//! silent success with no second effect. This is what makes both the
//! orchestrator's retry loop and the choreographer's at-least-once
//! delivery safe.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, ProductId};

use crate::error::SagaError;

/// Outcome of a reserve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Stock was reserved and the counter incremented.
    Reserved,
    /// An active reservation already existed for this order; no effect.
    AlreadyReserved,
}

/// Outcome of a release call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The reservation was released and the counter decremented.
    Released,
    /// No active reservation existed for this order; no effect.
    AlreadyReleased,
}

/// Trait for the per-product reservation counters.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Reserves stock for an order, idempotently keyed by `order_id`.
    async fn reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_id: OrderId,
    ) -> Result<ReserveOutcome, SagaError>;

    /// Releases the reservation held for `order_id`, idempotently. The
    /// active record carries the product and quantity, so the
    /// idempotency key alone identifies what to decrement.
    async fn release(&self, order_id: OrderId) -> Result<ReleaseOutcome, SagaError>;

    /// Returns the currently reserved quantity for a product.
    async fn reserved(&self, product_id: ProductId) -> Result<u32, SagaError>;
}

#[derive(Debug, Clone, Copy)]
struct ActiveReservation {
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct ProductRecord {
    reserved: u32,
    // bumped on every mutation; stands in for the optimistic version
    // column a row store would carry
    version: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    products: HashMap<ProductId, ProductRecord>,
    active: HashMap<OrderId, ActiveReservation>,
    fail_on_reserve: bool,
    fail_on_release: bool,
    unavailable: bool,
}

/// In-memory reservation store.
///
/// The whole read-modify-write runs under one write lock, so concurrent
/// orders for the same product never lose updates.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReservationStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryReservationStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures reserve calls to be rejected (insufficient stock).
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve = fail;
    }

    /// Configures release calls to fail transiently (store unavailable
    /// for the compensation path only).
    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }

    /// Configures every call to fail transiently.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Returns the number of active (unreleased) reservations.
    pub fn active_count(&self) -> usize {
        self.state.read().unwrap().active.len()
    }

    /// Returns true if an active reservation exists for the order.
    pub fn has_reservation(&self, order_id: OrderId) -> bool {
        self.state.read().unwrap().active.contains_key(&order_id)
    }

    /// Returns the mutation count for a product's record.
    pub fn record_version(&self, product_id: ProductId) -> u64 {
        self.state
            .read()
            .unwrap()
            .products
            .get(&product_id)
            .map(|r| r.version)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_id: OrderId,
    ) -> Result<ReserveOutcome, SagaError> {
        let mut state = self.state.write().unwrap();

        if state.unavailable {
            return Err(SagaError::Transient {
                operation: "reserve",
                reason: "reservation store unavailable".to_string(),
            });
        }

        if state.active.contains_key(&order_id) {
            tracing::debug!(%order_id, "duplicate reserve, treating as success");
            return Ok(ReserveOutcome::AlreadyReserved);
        }

        if state.fail_on_reserve {
            return Err(SagaError::Rejected("insufficient stock".to_string()));
        }

        let record = state.products.entry(product_id).or_default();
        record.reserved += quantity;
        record.version += 1;
        state.active.insert(
            order_id,
            ActiveReservation {
                product_id,
                quantity,
            },
        );

        Ok(ReserveOutcome::Reserved)
    }

    async fn release(&self, order_id: OrderId) -> Result<ReleaseOutcome, SagaError> {
        let mut state = self.state.write().unwrap();

        if state.unavailable || state.fail_on_release {
            return Err(SagaError::Transient {
                operation: "release",
                reason: "reservation store unavailable".to_string(),
            });
        }

        let Some(reservation) = state.active.remove(&order_id) else {
            tracing::debug!(%order_id, "duplicate release, treating as success");
            return Ok(ReleaseOutcome::AlreadyReleased);
        };

        let record = state.products.entry(reservation.product_id).or_default();
        // cannot underflow: every active reservation was counted on reserve
        record.reserved = record.reserved.saturating_sub(reservation.quantity);
        record.version += 1;

        Ok(ReleaseOutcome::Released)
    }

    async fn reserved(&self, product_id: ProductId) -> Result<u32, SagaError> {
        let state = self.state.read().unwrap();
        if state.unavailable {
            return Err(SagaError::Transient {
                operation: "reserved",
                reason: "reservation store unavailable".to_string(),
            });
        }
        Ok(state
            .products
            .get(&product_id)
            .map(|r| r.reserved)
            .unwrap_or(0))
    }
}
