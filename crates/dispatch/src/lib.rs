//! Batched-parallel dispatch engine with bounded retry.
//!
//! [`DispatchEngine`] turns a client list into a sequence of bounded-size
//! concurrent batches: every submission in a batch runs in parallel and is
//! allowed to settle (all-settled, never fail-fast), failed items re-enter
//! through a prioritized retry queue with a fixed attempt cap, and
//! lifecycle events are published on the [`remit_events::EventBus`].

pub mod engine;
pub mod retry;
pub mod store;

pub use engine::{DispatchEngine, DispatchError, DispatchReport, EngineConfig};
pub use retry::{next_batch, WorkItem, MAX_RETRIES};
pub use store::{BatchProgress, JobStore, PgJobStore, StoreError};
