//! Order entity and saga state machine.
//!
//! This crate holds everything both saga drivers share: the `Order`
//! entity, the legal status transitions (`OrderStatus` × `SagaSignal`),
//! and the in-memory `OrderStore`. The orchestrated and choreographed
//! modes mutate orders exclusively through this transition table, which
//! is what makes their final outcomes comparable.

pub mod error;
pub mod order;
pub mod status;
pub mod store;

pub use error::OrderError;
pub use order::Order;
pub use status::{OrderStatus, SagaSignal, Transition};
pub use store::OrderStore;
