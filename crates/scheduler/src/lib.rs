//! Recurring job scheduling for the dispatch engine.
//!
//! [`PaymentScheduler`] owns the recurring timer (fixed hour-of-day fire
//! slots), enforces the single-flight invariant (at most one job in flight
//! per scheduler instance), persists its enable-state across restarts and
//! reconciles the in-memory timer against the store on a fixed interval.

pub mod scheduler;
pub mod source;

pub use scheduler::{
    PaymentScheduler, RunningJob, SchedulerError, SchedulerStatus, StartReceipt, STOP_REASON,
};
pub use source::{ClientSource, PgClientSource, PgStateStore, StateStore};
