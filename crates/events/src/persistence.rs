//! Durable event persistence service.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and writes every received [`PaymentEvent`] to the
//! `events` table. It runs as a long-lived background task and shuts down
//! when the bus sender is dropped.

use remit_db::repositories::EventRepo;
use remit_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PaymentEvent;

/// Background service that persists platform events to the database.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop.
    ///
    /// Persists every event received on `receiver`. Write failures are
    /// logged and skipped; delivery to the table is best-effort. The loop
    /// exits when the channel is closed.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<PaymentEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) =
                        EventRepo::insert(&pool, &event.event_type, event.job_id, &event.payload)
                            .await
                    {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }
}
