//! Shared identifier types used by both saga execution modes.

pub mod types;

pub use types::{AttemptId, EventId, OrderId, ProductId};
