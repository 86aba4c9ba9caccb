//! Minimal in-process pub/sub substrate for the choreographed saga.
//!
//! Two delivery primitives, modeled on a broker's queue/exchange split:
//!
//! - a **direct queue** delivers each published message to exactly one
//!   consumer among its subscribers (competing consumers);
//! - a **fan-out topic** delivers a copy of each message to every queue
//!   bound to it.
//!
//! Each queue is a single FIFO channel, so messages sharing a partition
//! key (the order ID) are received in publish order. The bus never
//! deduplicates; delivery is at-least-once from the consumer's point of
//! view and deduplication is the consumer's job.
//!
//! Subscriptions are explicit channel handles rather than registered
//! callbacks, so handler lifetime and backpressure are visible at the
//! call site.

pub mod bus;
pub mod error;

pub use bus::{EventBus, Subscription};
pub use error::BusError;
