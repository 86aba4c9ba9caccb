//! External service traits and in-memory implementations.

pub mod payment;
pub mod reservation;

pub use payment::{
    PaymentAttempt, PaymentBehavior, PaymentGateway, PaymentOutcome, StubPaymentGateway,
};
pub use reservation::{
    InMemoryReservationStore, ReleaseOutcome, ReservationStore, ReserveOutcome,
};
