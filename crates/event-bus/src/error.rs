//! Bus error types.

use thiserror::Error;

/// Errors that can occur during bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The named queue has not been declared.
    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    /// The named topic has not been declared.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// The queue's channel is closed (all receivers dropped).
    #[error("queue closed: {0}")]
    Closed(String),
}
