//! Event sink infrastructure for the remit payment platform.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Delivery is fire-and-forget, at-most-once.
//! - [`PaymentEvent`] — the canonical event envelope.
//! - [`EventPersistence`] — background service that writes every event to
//!   the `events` table.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, PaymentEvent};
pub use persistence::EventPersistence;
