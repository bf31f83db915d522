//! Repository for the `payment_jobs` table.
//!
//! Progress and terminal updates are guarded on the row still being in a
//! non-terminal status, so a job that was stopped or already finished is
//! never resurrected by a late write from an abandoned run.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::{JobListQuery, NewJob, PaymentJob};
use crate::models::status::JobStatus;

/// Column list for `payment_jobs` queries.
const COLUMNS: &str = "\
    id, status_id, total_count, batch_size, include_inactive, is_scheduled, \
    processed, successful, failed, error_message, stats, \
    started_at, completed_at, created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// CRUD operations for disbursement jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job row in `running` status with `started_at = NOW()`.
    pub async fn create(pool: &PgPool, input: &NewJob) -> Result<PaymentJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO payment_jobs \
                 (id, status_id, total_count, batch_size, include_inactive, \
                  is_scheduled, started_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PaymentJob>(&query)
            .bind(input.id)
            .bind(JobStatus::Running.id())
            .bind(input.total_count)
            .bind(input.batch_size)
            .bind(input.include_inactive)
            .bind(input.is_scheduled)
            .fetch_one(pool)
            .await
    }

    /// Batch-boundary progress update.
    ///
    /// Only applies while the row is still `running`. Returns `false` when
    /// nothing was updated, meaning the job was stopped or completed
    /// elsewhere and the caller should abandon the run.
    pub async fn update_progress(
        pool: &PgPool,
        job_id: Uuid,
        processed: i32,
        successful: i32,
        failed: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE payment_jobs \
             SET processed = $2, successful = $3, failed = $4, updated_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(job_id)
        .bind(processed)
        .bind(successful)
        .bind(failed)
        .bind(JobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a job completed with its final statistics snapshot.
    ///
    /// A no-op if the row already reached a terminal status.
    pub async fn complete(
        pool: &PgPool,
        job_id: Uuid,
        processed: i32,
        successful: i32,
        failed: i32,
        stats: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE payment_jobs \
             SET status_id = $2, processed = $3, successful = $4, failed = $5, \
                 stats = $6, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $7",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.id())
        .bind(processed)
        .bind(successful)
        .bind(failed)
        .bind(stats)
        .bind(JobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a job failed with an error message.
    ///
    /// A no-op if the row already reached a terminal status.
    pub async fn fail(pool: &PgPool, job_id: Uuid, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE payment_jobs \
             SET status_id = $2, error_message = $3, completed_at = NOW(), \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($4, $5)",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .bind(JobStatus::Completed.id())
        .bind(JobStatus::Failed.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<PaymentJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payment_jobs WHERE id = $1");
        sqlx::query_as::<_, PaymentJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List recent jobs, newest first, with pagination.
    pub async fn list_recent(
        pool: &PgPool,
        params: &JobListQuery,
    ) -> Result<Vec<PaymentJob>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM payment_jobs \
             ORDER BY created_at DESC \
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, PaymentJob>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
