//! Work items and the two-queue batch builder.

use std::collections::VecDeque;

use remit_core::types::Timestamp;
use remit_db::models::client::Client;

/// Maximum number of retries per item. An item that keeps failing is
/// dispatched at most `MAX_RETRIES + 1` times in total.
pub const MAX_RETRIES: u32 = 3;

/// A client queued for dispatch, carrying its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub client: Client,
    /// Failed attempts so far (0 for a fresh item).
    pub attempts: u32,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
    pub last_attempt_at: Option<Timestamp>,
}

impl WorkItem {
    /// Wrap a client that has not been attempted yet.
    pub fn fresh(client: Client) -> Self {
        Self {
            client,
            attempts: 0,
            last_error: None,
            last_attempt_at: None,
        }
    }

    /// The item after one more failed attempt, ready for requeueing.
    pub fn requeued(mut self, error: String) -> Self {
        self.attempts += 1;
        self.last_error = Some(error);
        self.last_attempt_at = Some(chrono::Utc::now());
        self
    }

    /// Whether this item was requeued at least once.
    pub fn is_retry(&self) -> bool {
        self.attempts > 0
    }
}

/// Drain the next batch, filling from the retry queue first so failed
/// items re-enter before fresh ones can starve them. Never exceeds
/// `batch_size`; returns an empty batch only when both queues are empty.
pub fn next_batch(
    retries: &mut VecDeque<WorkItem>,
    fresh: &mut VecDeque<WorkItem>,
    batch_size: usize,
) -> Vec<WorkItem> {
    let mut batch = Vec::with_capacity(batch_size.min(retries.len() + fresh.len()));
    while batch.len() < batch_size {
        if let Some(item) = retries.pop_front() {
            batch.push(item);
        } else {
            break;
        }
    }
    while batch.len() < batch_size {
        if let Some(item) = fresh.pop_front() {
            batch.push(item);
        } else {
            break;
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: i64) -> Client {
        let now = chrono::Utc::now();
        Client {
            id,
            subscriber_no: format!("SUB{id:04}"),
            offer_code: "OFFER-A".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn queue(ids: &[i64], attempts: u32) -> VecDeque<WorkItem> {
        ids.iter()
            .map(|&id| WorkItem {
                attempts,
                ..WorkItem::fresh(client(id))
            })
            .collect()
    }

    #[test]
    fn batch_is_bounded_by_batch_size() {
        let mut retries = queue(&[1, 2], 1);
        let mut fresh = queue(&[3, 4, 5], 0);

        let batch = next_batch(&mut retries, &mut fresh, 3);
        assert_eq!(batch.len(), 3);
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn retries_come_first() {
        let mut retries = queue(&[10], 2);
        let mut fresh = queue(&[20, 30], 0);

        let batch = next_batch(&mut retries, &mut fresh, 2);
        assert_eq!(batch[0].client.id, 10);
        assert!(batch[0].is_retry());
        assert_eq!(batch[1].client.id, 20);
        assert!(!batch[1].is_retry());
    }

    #[test]
    fn retries_alone_can_fill_the_batch() {
        let mut retries = queue(&[1, 2, 3], 1);
        let mut fresh = queue(&[4], 0);

        let batch = next_batch(&mut retries, &mut fresh, 3);
        assert!(batch.iter().all(WorkItem::is_retry));
        assert_eq!(fresh.len(), 1, "fresh item must wait for the next round");
    }

    #[test]
    fn empty_queues_yield_empty_batch() {
        let mut retries = VecDeque::new();
        let mut fresh = VecDeque::new();
        assert!(next_batch(&mut retries, &mut fresh, 10).is_empty());
    }

    #[test]
    fn requeue_increments_attempts_and_records_error() {
        let item = WorkItem::fresh(client(7));
        let item = item.requeued("HTTP 503".into());
        assert_eq!(item.attempts, 1);
        assert_eq!(item.last_error.as_deref(), Some("HTTP 503"));
        assert!(item.last_attempt_at.is_some());
    }
}
