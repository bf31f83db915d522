//! Collaborator seams: the client roster and the persisted scheduler state.
//!
//! Both traits exist so the scheduler can be exercised with in-memory
//! implementations; the `Pg*` adapters delegate to the repositories.

use async_trait::async_trait;
use remit_core::settings::SchedulerSettings;
use remit_db::models::client::Client;
use remit_db::repositories::{ClientRepo, SchedulerStateRepo};
use remit_db::DbPool;
use remit_dispatch::StoreError;

/// Source of the client list for a disbursement run.
///
/// Ordering of the returned list is unspecified; callers must not rely
/// on it.
#[async_trait]
pub trait ClientSource: Send + Sync {
    async fn list_clients(&self, include_inactive: bool) -> Result<Vec<Client>, StoreError>;
}

/// Durable storage for the scheduler settings (singleton).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, settings: &SchedulerSettings) -> Result<(), StoreError>;
    async fn load(&self) -> Result<Option<SchedulerSettings>, StoreError>;
}

/// PostgreSQL-backed client source.
pub struct PgClientSource {
    pool: DbPool,
}

impl PgClientSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientSource for PgClientSource {
    async fn list_clients(&self, include_inactive: bool) -> Result<Vec<Client>, StoreError> {
        Ok(ClientRepo::list(&self.pool, include_inactive).await?)
    }
}

/// PostgreSQL-backed state store.
pub struct PgStateStore {
    pool: DbPool,
}

impl PgStateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn save(&self, settings: &SchedulerSettings) -> Result<(), StoreError> {
        Ok(SchedulerStateRepo::save(&self.pool, settings).await?)
    }

    async fn load(&self) -> Result<Option<SchedulerSettings>, StoreError> {
        Ok(SchedulerStateRepo::load(&self.pool).await?)
    }
}
