//! Client entity model.

use remit_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `clients` table.
///
/// Immutable for the duration of a job; a disbursement run works on the
/// snapshot returned by `ClientRepo::list`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Client {
    pub id: DbId,
    /// Subscriber number submitted to the payment endpoint.
    pub subscriber_no: String,
    /// Offer/product code for the disbursement.
    pub offer_code: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
