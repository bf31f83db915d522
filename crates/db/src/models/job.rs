//! Payment job entity models and DTOs.

use remit_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::StatusId;

/// A row from the `payment_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentJob {
    pub id: Uuid,
    pub status_id: StatusId,
    /// Number of clients in the run.
    pub total_count: i32,
    pub batch_size: i32,
    pub include_inactive: bool,
    /// True for timer-fired runs, false for manual ones.
    pub is_scheduled: bool,
    /// Dispatch attempts settled so far.
    pub processed: i32,
    pub successful: i32,
    pub failed: i32,
    pub error_message: Option<String>,
    /// Final statistics snapshot, serialized at completion.
    pub stats: Option<serde_json::Value>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields for inserting a new job row.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: Uuid,
    pub total_count: i32,
    pub batch_size: i32,
    pub include_inactive: bool,
    pub is_scheduled: bool,
}

/// Query parameters for listing job history.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
