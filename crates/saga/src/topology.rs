//! Queue and topic names for the choreographed saga.

/// Direct queue: order service → inventory service.
pub const ORDER_CREATED_QUEUE: &str = "order_created";

/// Direct queue: inventory service → payment service.
pub const STOCK_RESERVED_QUEUE: &str = "stock_reserved";

/// Direct queue: inventory service → order service, closing the saga
/// when the initial reservation is rejected.
pub const STOCK_RESERVE_FAILED_QUEUE: &str = "stock_reserve_failed";

/// Direct queue: payment service → order service on success.
pub const PAYMENT_SUCCEEDED_QUEUE: &str = "payment_succeeded";

/// Fan-out topic for the compensation broadcast: two independent
/// participants must react to the same payment failure.
pub const PAYMENT_FAILED_TOPIC: &str = "payment_failed";

/// Bound queue on [`PAYMENT_FAILED_TOPIC`] consumed by the inventory
/// compensation handler.
pub const INVENTORY_PAYMENT_FAILED_QUEUE: &str = "inventory_payment_failed";

/// Bound queue on [`PAYMENT_FAILED_TOPIC`] consumed by the order
/// compensation handler.
pub const ORDER_PAYMENT_FAILED_QUEUE: &str = "order_payment_failed";
