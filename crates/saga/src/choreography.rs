//! Choreographed (event-driven) saga execution.
//!
//! No coordinator: each participant is a spawned task consuming from its
//! queue subscription and publishing further events, with a fan-out
//! broadcast for the compensation step. The event flow:
//!
//! ```text
//! create_order ──▶ order_created ──▶ [inventory] ──▶ stock_reserved ──▶ [payment]
//!                                        │                                 │
//!                                        ▼                                 ├─▶ payment_succeeded ──▶ [order]
//!                                 stock_reserve_failed ──▶ [order]         │
//!                                                                          ▼
//!                                                             payment_failed (fan-out)
//!                                                               ├─▶ inventory_payment_failed ──▶ [inventory release]
//!                                                               └─▶ order_payment_failed ──────▶ [order]
//! ```
//!
//! The consumer of an event applies the order transition that event
//! implies before acting on it, so status changes always happen in
//! reaction to a consumed event and per-order FIFO keeps them in
//! sequence. Every consumer tolerates duplicate delivery: an `event_id`
//! dedup set in front, idempotent store operations and the
//! state-machine no-op guard behind it.

use std::collections::HashSet;

use common::ProductId;
use domain::{Order, OrderStatus, OrderStore, SagaSignal};
use event_bus::{EventBus, Subscription};
use tokio::task::JoinHandle;

use crate::error::SagaError;
use crate::events::{EventPayload, SagaEvent};
use crate::orchestrator::{OrderReceipt, UNIT_PRICE};
use crate::policy::RetryPolicy;
use crate::services::{PaymentGateway, PaymentOutcome, ReservationStore};
use crate::topology;

/// Event-driven saga driver.
///
/// Owns the bus topology and the handler tasks. Dropping the
/// choreographer aborts its handlers.
pub struct Choreographer<R, P> {
    bus: EventBus<SagaEvent>,
    orders: OrderStore,
    reservations: R,
    payments: P,
    policy: RetryPolicy,
    tasks: Vec<JoinHandle<()>>,
}

impl<R, P> Choreographer<R, P>
where
    R: ReservationStore + Clone + Send + Sync + 'static,
    P: PaymentGateway + Clone + Send + Sync + 'static,
{
    /// Creates a choreographer with the default retry policy.
    pub fn new(orders: OrderStore, reservations: R, payments: P) -> Result<Self, SagaError> {
        Self::with_policy(orders, reservations, payments, RetryPolicy::default())
    }

    /// Creates a choreographer with an explicit retry policy, declaring
    /// the full queue topology on a fresh bus.
    pub fn with_policy(
        orders: OrderStore,
        reservations: R,
        payments: P,
        policy: RetryPolicy,
    ) -> Result<Self, SagaError> {
        let bus = EventBus::new();
        bus.declare_queue(topology::ORDER_CREATED_QUEUE);
        bus.declare_queue(topology::STOCK_RESERVED_QUEUE);
        bus.declare_queue(topology::STOCK_RESERVE_FAILED_QUEUE);
        bus.declare_queue(topology::PAYMENT_SUCCEEDED_QUEUE);
        bus.declare_queue(topology::INVENTORY_PAYMENT_FAILED_QUEUE);
        bus.declare_queue(topology::ORDER_PAYMENT_FAILED_QUEUE);
        bus.declare_topic(topology::PAYMENT_FAILED_TOPIC);
        bus.bind(
            topology::PAYMENT_FAILED_TOPIC,
            topology::INVENTORY_PAYMENT_FAILED_QUEUE,
        )?;
        bus.bind(
            topology::PAYMENT_FAILED_TOPIC,
            topology::ORDER_PAYMENT_FAILED_QUEUE,
        )?;

        Ok(Self {
            bus,
            orders,
            reservations,
            payments,
            policy,
            tasks: Vec::new(),
        })
    }

    /// Returns the underlying bus, e.g. to inject duplicate deliveries.
    pub fn bus(&self) -> &EventBus<SagaEvent> {
        &self.bus
    }

    /// Returns the shared order store (the poll surface).
    pub fn orders(&self) -> &OrderStore {
        &self.orders
    }

    /// Subscribes and spawns every handler task.
    pub fn start(&mut self) -> Result<(), SagaError> {
        let reserve_sub = self.bus.subscribe(topology::ORDER_CREATED_QUEUE)?;
        let payment_sub = self.bus.subscribe(topology::STOCK_RESERVED_QUEUE)?;
        let reserve_failed_sub = self.bus.subscribe(topology::STOCK_RESERVE_FAILED_QUEUE)?;
        let succeeded_sub = self.bus.subscribe(topology::PAYMENT_SUCCEEDED_QUEUE)?;
        let release_sub = self.bus.subscribe(topology::INVENTORY_PAYMENT_FAILED_QUEUE)?;
        let order_failed_sub = self.bus.subscribe(topology::ORDER_PAYMENT_FAILED_QUEUE)?;

        self.tasks.push(tokio::spawn(inventory_reserve_handler(
            reserve_sub,
            self.bus.clone(),
            self.reservations.clone(),
        )));
        self.tasks.push(tokio::spawn(payment_handler(
            payment_sub,
            self.bus.clone(),
            self.orders.clone(),
            self.payments.clone(),
        )));
        self.tasks.push(tokio::spawn(order_signal_handler(
            reserve_failed_sub,
            self.orders.clone(),
        )));
        self.tasks.push(tokio::spawn(order_signal_handler(
            succeeded_sub,
            self.orders.clone(),
        )));
        self.tasks.push(tokio::spawn(order_signal_handler(
            order_failed_sub,
            self.orders.clone(),
        )));
        self.tasks.push(tokio::spawn(inventory_release_handler(
            release_sub,
            self.reservations.clone(),
            self.policy,
        )));

        tracing::info!(handlers = self.tasks.len(), "choreography started");
        Ok(())
    }

    /// Creates the order and kicks off the saga; returns immediately
    /// with a `Pending` receipt. Completion is observed by polling the
    /// order store.
    #[tracing::instrument(skip(self))]
    pub fn create_order(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<OrderReceipt, SagaError> {
        let order = Order::new(product_id, quantity);
        let order_id = order.id();
        self.orders.insert(order);
        metrics::counter!("saga_orders_total", "mode" => "choreographed").increment(1);

        self.bus.publish(
            topology::ORDER_CREATED_QUEUE,
            SagaEvent::order_created(order_id, product_id, quantity),
        )?;

        Ok(OrderReceipt {
            order_id,
            status: OrderStatus::Pending,
        })
    }

    /// Aborts all handler tasks.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl<R, P> Drop for Choreographer<R, P> {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Tracks which events a consumer has already processed.
#[derive(Default)]
struct SeenEvents {
    ids: HashSet<common::EventId>,
}

impl SeenEvents {
    /// Returns true if the event was seen before; records it otherwise.
    fn is_duplicate(&mut self, event: &SagaEvent, queue: &'static str) -> bool {
        if self.ids.insert(event.event_id) {
            return false;
        }
        tracing::debug!(
            event_id = %event.event_id,
            order_id = %event.order_id,
            queue,
            "duplicate event ignored"
        );
        metrics::counter!("saga_duplicate_events_total", "queue" => queue).increment(1);
        true
    }
}

/// Inventory service: reserves stock for each new order.
async fn inventory_reserve_handler<R>(
    sub: Subscription<SagaEvent>,
    bus: EventBus<SagaEvent>,
    reservations: R,
) where
    R: ReservationStore,
{
    let mut seen = SeenEvents::default();
    while let Some(event) = sub.recv().await {
        if seen.is_duplicate(&event, topology::ORDER_CREATED_QUEUE) {
            continue;
        }
        let EventPayload::OrderCreated {
            product_id,
            quantity,
        } = &event.payload
        else {
            drop_unexpected(&event, topology::ORDER_CREATED_QUEUE);
            continue;
        };
        let (product_id, quantity) = (*product_id, *quantity);
        let order_id = event.order_id;

        let next = match reservations.reserve(product_id, quantity, order_id).await {
            Ok(outcome) => {
                tracing::info!(%order_id, ?outcome, "stock reserved");
                SagaEvent::stock_reserved(order_id)
            }
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "stock reservation failed");
                SagaEvent::stock_reserve_failed(order_id, err.to_string())
            }
        };
        let queue = if matches!(next.payload, EventPayload::StockReserved) {
            topology::STOCK_RESERVED_QUEUE
        } else {
            topology::STOCK_RESERVE_FAILED_QUEUE
        };
        if let Err(err) = bus.publish(queue, next) {
            tracing::error!(%order_id, queue, error = %err, "publish failed");
        }
    }
}

/// Payment service: records the order as reserved, then charges it.
async fn payment_handler<P>(
    sub: Subscription<SagaEvent>,
    bus: EventBus<SagaEvent>,
    orders: OrderStore,
    payments: P,
) where
    P: PaymentGateway,
{
    let mut seen = SeenEvents::default();
    while let Some(event) = sub.recv().await {
        if seen.is_duplicate(&event, topology::STOCK_RESERVED_QUEUE) {
            continue;
        }
        let EventPayload::StockReserved = &event.payload else {
            drop_unexpected(&event, topology::STOCK_RESERVED_QUEUE);
            continue;
        };
        let order_id = event.order_id;

        // The reservation is a fact now; record it before charging so a
        // later PaymentFailed always finds the order in StockReserved.
        // A no-op means this order was already charged for: skip it.
        match orders.apply(order_id, SagaSignal::StockReserveOk) {
            Ok(transition) if transition.changed() => {}
            Ok(_) => {
                tracing::debug!(%order_id, "reservation already recorded, skipping charge");
                continue;
            }
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "dropping event, transition rejected");
                continue;
            }
        }
        let Some(order) = orders.get(order_id) else {
            tracing::warn!(%order_id, "dropping event, unknown order");
            continue;
        };

        let amount = u64::from(order.quantity()) * UNIT_PRICE;
        let next = match payments.attempt(order_id, amount).await {
            Ok(attempt) if attempt.outcome == PaymentOutcome::Success => {
                tracing::info!(%order_id, attempt_id = %attempt.attempt_id, "payment succeeded");
                SagaEvent::payment_succeeded(order_id, attempt.attempt_id)
            }
            Ok(attempt) => {
                tracing::warn!(%order_id, attempt_id = %attempt.attempt_id, "payment declined");
                SagaEvent::payment_failed(order_id, "payment declined")
            }
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "payment call failed");
                SagaEvent::payment_failed(order_id, err.to_string())
            }
        };
        let result = if matches!(next.payload, EventPayload::PaymentSucceeded { .. }) {
            bus.publish(topology::PAYMENT_SUCCEEDED_QUEUE, next)
        } else {
            bus.publish_topic(topology::PAYMENT_FAILED_TOPIC, next)
                .map(|_| ())
        };
        if let Err(err) = result {
            tracing::error!(%order_id, error = %err, "publish failed");
        }
    }
}

/// Order service: applies the transition implied by each consumed event.
async fn order_signal_handler(sub: Subscription<SagaEvent>, orders: OrderStore) {
    let queue: &'static str = match sub.queue() {
        q if q == topology::STOCK_RESERVE_FAILED_QUEUE => topology::STOCK_RESERVE_FAILED_QUEUE,
        q if q == topology::PAYMENT_SUCCEEDED_QUEUE => topology::PAYMENT_SUCCEEDED_QUEUE,
        _ => topology::ORDER_PAYMENT_FAILED_QUEUE,
    };
    let mut seen = SeenEvents::default();
    while let Some(event) = sub.recv().await {
        if seen.is_duplicate(&event, queue) {
            continue;
        }
        let signal = match &event.payload {
            EventPayload::StockReserveFailed { .. } => SagaSignal::StockReserveFailed,
            EventPayload::PaymentSucceeded { .. } => SagaSignal::PaymentSucceeded,
            EventPayload::PaymentFailed { .. } => SagaSignal::PaymentFailed,
            _ => {
                drop_unexpected(&event, queue);
                continue;
            }
        };
        let order_id = event.order_id;
        match orders.apply(order_id, signal) {
            Ok(transition) if transition.changed() => {
                tracing::info!(%order_id, ?signal, "order transitioned");
            }
            Ok(_) => {
                tracing::debug!(%order_id, ?signal, "transition already applied");
            }
            Err(err) => {
                // out-of-order or unknown; drop, never retry
                tracing::warn!(%order_id, ?signal, error = %err, "dropping event");
            }
        }
    }
}

/// Inventory compensation: releases the reservation when payment fails.
async fn inventory_release_handler<R>(
    sub: Subscription<SagaEvent>,
    reservations: R,
    policy: RetryPolicy,
) where
    R: ReservationStore,
{
    let mut seen = SeenEvents::default();
    while let Some(event) = sub.recv().await {
        if seen.is_duplicate(&event, topology::INVENTORY_PAYMENT_FAILED_QUEUE) {
            continue;
        }
        let EventPayload::PaymentFailed { .. } = &event.payload else {
            drop_unexpected(&event, topology::INVENTORY_PAYMENT_FAILED_QUEUE);
            continue;
        };
        let order_id = event.order_id;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match reservations.release(order_id).await {
                Ok(outcome) => {
                    tracing::info!(%order_id, attempt, ?outcome, "reservation released");
                    break;
                }
                Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                    tracing::warn!(%order_id, attempt, error = %err, "release failed, retrying");
                    metrics::counter!("saga_compensation_retries_total").increment(1);
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
                Err(err) => {
                    tracing::error!(%order_id, attempt, error = %err, "compensation failed, reservation still held");
                    metrics::counter!("saga_compensation_failures_total").increment(1);
                    break;
                }
            }
        }
    }
}

fn drop_unexpected(event: &SagaEvent, queue: &'static str) {
    tracing::warn!(
        event_id = %event.event_id,
        order_id = %event.order_id,
        event_type = event.event_type(),
        queue,
        "unexpected event on queue, dropping"
    );
}
