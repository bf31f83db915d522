//! Job store seam between the engine and the database.
//!
//! The engine and scheduler talk to [`JobStore`] so their logic can be
//! exercised against an in-memory implementation; [`PgJobStore`] is the
//! production adapter over [`remit_db::repositories::JobRepo`].

use async_trait::async_trait;
use remit_core::stats::JobStats;
use remit_db::models::job::NewJob;
use remit_db::repositories::JobRepo;
use remit_db::DbPool;
use uuid::Uuid;

/// Opaque persistence failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError(e.to_string())
    }
}

/// Monotonic per-job counters written at batch boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Dispatch attempts settled so far.
    pub processed: i32,
    pub successful: i32,
    pub failed: i32,
}

impl BatchProgress {
    /// Project the attempt counters out of a stats snapshot.
    pub fn from_stats(stats: &JobStats) -> Self {
        Self {
            processed: stats.attempted as i32,
            successful: stats.successful as i32,
            failed: stats.failed as i32,
        }
    }
}

/// Durable record of job identity, counts and status.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert the job row at run start.
    async fn create(&self, job: &NewJob) -> Result<(), StoreError>;

    /// Batch-boundary progress update.
    ///
    /// Returns `false` when the job is no longer tracked (stopped or
    /// already terminal) and the run should be abandoned.
    async fn record_progress(&self, job_id: Uuid, progress: &BatchProgress)
        -> Result<bool, StoreError>;

    /// Terminal success with the final statistics snapshot.
    async fn complete(
        &self,
        job_id: Uuid,
        progress: &BatchProgress,
        stats: &JobStats,
    ) -> Result<(), StoreError>;

    /// Terminal failure with an error message.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<(), StoreError>;
}

/// PostgreSQL-backed job store.
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &NewJob) -> Result<(), StoreError> {
        JobRepo::create(&self.pool, job).await?;
        Ok(())
    }

    async fn record_progress(
        &self,
        job_id: Uuid,
        progress: &BatchProgress,
    ) -> Result<bool, StoreError> {
        let tracked = JobRepo::update_progress(
            &self.pool,
            job_id,
            progress.processed,
            progress.successful,
            progress.failed,
        )
        .await?;
        Ok(tracked)
    }

    async fn complete(
        &self,
        job_id: Uuid,
        progress: &BatchProgress,
        stats: &JobStats,
    ) -> Result<(), StoreError> {
        let snapshot = serde_json::to_value(stats).unwrap_or(serde_json::Value::Null);
        JobRepo::complete(
            &self.pool,
            job_id,
            progress.processed,
            progress.successful,
            progress.failed,
            &snapshot,
        )
        .await?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<(), StoreError> {
        JobRepo::fail(&self.pool, job_id, error).await?;
        Ok(())
    }
}
