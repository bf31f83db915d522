//! Repository for the `clients` table.

use sqlx::PgPool;

use crate::models::client::Client;

/// Column list for `clients` queries.
const COLUMNS: &str = "\
    id, subscriber_no, offer_code, is_active, created_at, updated_at";

/// Read access to the client roster.
pub struct ClientRepo;

impl ClientRepo {
    /// List clients eligible for a disbursement run.
    ///
    /// With `include_inactive` false only active clients are returned.
    /// Row ordering is unspecified; callers must not rely on it.
    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Client>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE is_active OR $1");
        sqlx::query_as::<_, Client>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }
}
