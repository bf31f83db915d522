//! Repository for the `scheduler_state` singleton row.

use remit_core::settings::SchedulerSettings;
use sqlx::PgPool;

use crate::models::scheduler_state::SchedulerState;

/// Fixed primary key of the singleton row.
const SINGLETON_ID: i16 = 1;

const COLUMNS: &str = "\
    id, interval_hours, batch_size, include_inactive, enabled, updated_at";

/// Upsert-style access to the persisted scheduler settings.
pub struct SchedulerStateRepo;

impl SchedulerStateRepo {
    /// Persist the settings, creating or replacing the singleton row.
    pub async fn save(pool: &PgPool, settings: &SchedulerSettings) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO scheduler_state \
                 (id, interval_hours, batch_size, include_inactive, enabled, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             ON CONFLICT (id) DO UPDATE SET \
                 interval_hours = EXCLUDED.interval_hours, \
                 batch_size = EXCLUDED.batch_size, \
                 include_inactive = EXCLUDED.include_inactive, \
                 enabled = EXCLUDED.enabled, \
                 updated_at = NOW()",
        )
        .bind(SINGLETON_ID)
        .bind(settings.interval_hours as i32)
        .bind(settings.batch_size as i32)
        .bind(settings.include_inactive)
        .bind(settings.enabled)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Load the persisted settings, or `None` before the first save.
    pub async fn load(pool: &PgPool) -> Result<Option<SchedulerSettings>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scheduler_state WHERE id = $1");
        let row = sqlx::query_as::<_, SchedulerState>(&query)
            .bind(SINGLETON_ID)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(SchedulerSettings::from))
    }
}
