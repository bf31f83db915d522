//! Repository for the `events` table.

use remit_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::event::EventRow;

const COLUMNS: &str = "id, event_type, job_id, payload, created_at";

/// Maximum page size for event listing.
const MAX_LIMIT: i64 = 500;

/// Append-only access to the event log.
pub struct EventRepo;

impl EventRepo {
    /// Insert one event, returning its row ID.
    pub async fn insert(
        pool: &PgPool,
        event_type: &str,
        job_id: Option<Uuid>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO events (event_type, job_id, payload) \
             VALUES ($1, $2, $3) \
             RETURNING id",
        )
        .bind(event_type)
        .bind(job_id)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// List recent events, newest first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<EventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             ORDER BY created_at DESC \
             LIMIT $1"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(limit.clamp(1, MAX_LIMIT))
            .fetch_all(pool)
            .await
    }
}
