//! Persisted scheduler state (singleton row).

use remit_core::settings::SchedulerSettings;
use remit_core::types::Timestamp;
use sqlx::FromRow;

/// The singleton row from `scheduler_state`.
#[derive(Debug, Clone, FromRow)]
pub struct SchedulerState {
    pub id: i16,
    pub interval_hours: i32,
    pub batch_size: i32,
    pub include_inactive: bool,
    pub enabled: bool,
    pub updated_at: Timestamp,
}

impl From<SchedulerState> for SchedulerSettings {
    fn from(row: SchedulerState) -> Self {
        SchedulerSettings {
            interval_hours: row.interval_hours.max(0) as u32,
            batch_size: row.batch_size.max(0) as u32,
            include_inactive: row.include_inactive,
            enabled: row.enabled,
        }
    }
}
