//! Saga transaction core.
//!
//! Drives the "reserve stock, charge payment, undo the reservation if
//! payment fails" transaction across independent services in two
//! interchangeable ways:
//!
//! 1. **Orchestrated** ([`Orchestrator`]): one coordinator issues the
//!    calls sequentially within a single request and performs explicit
//!    compensation when payment fails.
//! 2. **Choreographed** ([`Choreographer`]): no coordinator; each
//!    participant consumes events from the bus and publishes further
//!    events, with a fan-out broadcast for the compensation step.
//!
//! Both modes mutate the same [`domain::OrderStore`] through the same
//! transition table and share the same [`ReservationStore`], so a fixed
//! input produces the same terminal order status and the same reserved
//! quantity in either mode.

pub mod choreography;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod policy;
pub mod services;
pub mod topology;

pub use choreography::Choreographer;
pub use error::SagaError;
pub use events::{EventPayload, SagaEvent};
pub use orchestrator::{Orchestrator, OrderReceipt};
pub use policy::RetryPolicy;
pub use services::{
    InMemoryReservationStore, PaymentAttempt, PaymentBehavior, PaymentGateway, PaymentOutcome,
    ReleaseOutcome, ReservationStore, ReserveOutcome, StubPaymentGateway,
};
