//! Event log entity model.

use remit_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventRow {
    pub id: DbId,
    pub event_type: String,
    pub job_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
