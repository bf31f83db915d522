//! Event-name constants for the platform event sink.
//!
//! Dot-separated names, published on the event bus and stored verbatim
//! in the `events` table.

/// A disbursement job began processing.
pub const JOB_STARTED: &str = "job.started";

/// A batch of payment submissions was dispatched.
pub const BATCH_STARTED: &str = "batch.started";

/// A batch settled (every submission succeeded or failed).
pub const BATCH_COMPLETED: &str = "batch.completed";

/// A disbursement job finished with a final statistics snapshot.
pub const JOB_COMPLETED: &str = "job.completed";

/// A disbursement job aborted with an error.
pub const JOB_FAILED: &str = "job.failed";

/// A scheduled fire was skipped because a job was already running.
pub const JOB_SKIPPED: &str = "job.skipped";

/// The recurring schedule was armed.
pub const SCHEDULER_STARTED: &str = "scheduler.started";

/// The recurring schedule was disarmed.
pub const SCHEDULER_STOPPED: &str = "scheduler.stopped";

/// Scheduler settings were changed.
pub const SETTINGS_UPDATED: &str = "settings.updated";
