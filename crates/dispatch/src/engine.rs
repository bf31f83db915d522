//! The dispatch run loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use remit_core::event_types;
use remit_core::stats::JobStats;
use remit_events::{EventBus, PaymentEvent};
use remit_gateway::outcome::SubmissionOutcome;
use remit_gateway::PaymentSubmitter;
use remit_db::models::client::Client;
use uuid::Uuid;

use crate::retry::{next_batch, WorkItem, MAX_RETRIES};
use crate::store::{BatchProgress, JobStore, StoreError};

/// Delay between consecutive batches, pacing load on the upstream.
const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retry cap per item; total attempts are bounded by `max_retries + 1`.
    pub max_retries: u32,
    /// Pause between batches while work remains.
    pub batch_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

/// Why a dispatch run aborted.
///
/// Item-level failures never abort a run; only infrastructure problems do.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The job store rejected a write.
    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    /// The upstream is wholly unavailable (e.g. no credentials can be
    /// obtained), so no submission can even be attempted.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),
}

/// Result of a finished (or abandoned) dispatch run.
#[derive(Debug)]
pub struct DispatchReport {
    /// Every settled attempt, in settlement order per batch.
    pub outcomes: Vec<SubmissionOutcome>,
    /// Final statistics snapshot.
    pub stats: JobStats,
    /// Batches that were actually dispatched.
    pub batches: u32,
    /// True when the job stopped being tracked mid-run (stopped by an
    /// operator) and remaining work was discarded.
    pub abandoned: bool,
}

/// Batched-parallel dispatch engine with bounded retry.
///
/// One logical run loop owns the queues and the statistics, so no locking
/// is needed as long as a single run per job is active (the scheduler's
/// single-flight invariant).
pub struct DispatchEngine {
    submitter: Arc<dyn PaymentSubmitter>,
    store: Arc<dyn JobStore>,
    bus: Arc<EventBus>,
    config: EngineConfig,
}

impl DispatchEngine {
    pub fn new(
        submitter: Arc<dyn PaymentSubmitter>,
        store: Arc<dyn JobStore>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self::with_config(submitter, store, bus, EngineConfig::default())
    }

    pub fn with_config(
        submitter: Arc<dyn PaymentSubmitter>,
        store: Arc<dyn JobStore>,
        bus: Arc<EventBus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            submitter,
            store,
            bus,
            config,
        }
    }

    /// Run one job over `clients`.
    ///
    /// Emits `job.started` once, `batch.started`/`batch.completed` per
    /// batch and `job.completed` exactly once at the end (unless the run
    /// was abandoned). A zero-item run emits start/complete with zero
    /// counts and no batch events.
    #[tracing::instrument(skip(self, clients), fields(total = clients.len()))]
    pub async fn run(
        &self,
        job_id: Uuid,
        clients: Vec<Client>,
        batch_size: usize,
    ) -> Result<DispatchReport, DispatchError> {
        let batch_size = batch_size.max(1);
        let total = clients.len();
        let estimated_batches = total.div_ceil(batch_size);

        let mut stats = JobStats::started_now();
        let mut outcomes: Vec<SubmissionOutcome> = Vec::with_capacity(total);
        let mut fresh: VecDeque<WorkItem> = clients.into_iter().map(WorkItem::fresh).collect();
        let mut retries: VecDeque<WorkItem> = VecDeque::new();
        let mut batch_index: u32 = 0;
        let mut abandoned = false;

        self.publish(
            PaymentEvent::new(event_types::JOB_STARTED)
                .with_job(job_id)
                .with_payload(serde_json::json!({
                    "total": total,
                    "batch_size": batch_size,
                    "estimated_batches": estimated_batches,
                })),
        );
        tracing::info!(total, batch_size, estimated_batches, "Dispatch run started");

        loop {
            let batch = next_batch(&mut retries, &mut fresh, batch_size);
            if batch.is_empty() {
                break;
            }
            batch_index += 1;

            let retry_count = batch.iter().filter(|i| i.is_retry()).count();
            let fresh_count = batch.len() - retry_count;
            self.publish(
                PaymentEvent::new(event_types::BATCH_STARTED)
                    .with_job(job_id)
                    .with_payload(serde_json::json!({
                        "batch": batch_index,
                        "retry_count": retry_count,
                        "fresh_count": fresh_count,
                    })),
            );
            tracing::debug!(
                batch = batch_index,
                retry_count,
                fresh_count,
                "Dispatching batch",
            );

            // Fan out the whole batch and wait for every submission to
            // settle. Completion order within the batch is irrelevant.
            let settled = futures::future::join_all(batch.into_iter().map(|item| {
                let submitter = Arc::clone(&self.submitter);
                async move {
                    let result = submitter.submit(&item.client).await;
                    (item, result)
                }
            }))
            .await;

            let mut batch_successes: u32 = 0;
            let mut batch_failures: u32 = 0;

            for (item, result) in settled {
                match result {
                    Ok(outcome @ SubmissionOutcome::Success { .. }) => {
                        stats.record_success(outcome.endpoint());
                        batch_successes += 1;
                        outcomes.push(outcome);
                    }
                    Ok(SubmissionOutcome::Failure {
                        endpoint,
                        latency_ms,
                        kind,
                        message,
                    }) => {
                        stats.record_failure(endpoint, kind);
                        batch_failures += 1;

                        if item.attempts < self.config.max_retries {
                            stats.record_retry();
                            retries.push_back(item.requeued(message.clone()));
                        } else {
                            tracing::warn!(
                                subscriber_no = %item.client.subscriber_no,
                                attempts = item.attempts + 1,
                                error = %message,
                                "Client exhausted retry budget",
                            );
                        }
                        outcomes.push(SubmissionOutcome::Failure {
                            endpoint,
                            latency_ms,
                            kind,
                            message,
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Upstream unavailable, aborting run");
                        return Err(DispatchError::Upstream(e.to_string()));
                    }
                }
            }

            let tracked = self
                .store
                .record_progress(job_id, &BatchProgress::from_stats(&stats))
                .await?;
            if !tracked {
                tracing::info!(batch = batch_index, "Job no longer tracked, abandoning run");
                abandoned = true;
                break;
            }

            // The batch-count estimate shifts as the retry queue grows.
            let estimated_remaining = (fresh.len() + retries.len()).div_ceil(batch_size);
            self.publish(
                PaymentEvent::new(event_types::BATCH_COMPLETED)
                    .with_job(job_id)
                    .with_payload(serde_json::json!({
                        "batch": batch_index,
                        "successes": batch_successes,
                        "failures": batch_failures,
                        "retry_depth": retries.len(),
                        "estimated_remaining": estimated_remaining,
                    })),
            );

            let more_work = !(fresh.is_empty() && retries.is_empty());
            if more_work && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        stats.finish();

        if !abandoned {
            let snapshot = serde_json::to_value(&stats).unwrap_or(serde_json::Value::Null);
            self.publish(
                PaymentEvent::new(event_types::JOB_COMPLETED)
                    .with_job(job_id)
                    .with_payload(serde_json::json!({
                        "batches": batch_index,
                        "stats": snapshot,
                    })),
            );
            tracing::info!(
                batches = batch_index,
                attempted = stats.attempted,
                successful = stats.successful,
                failed = stats.failed,
                retried = stats.retried,
                permanent_failures = stats.permanent_failures(),
                "Dispatch run completed",
            );
        }

        Ok(DispatchReport {
            outcomes,
            stats,
            batches: batch_index,
            abandoned,
        })
    }

    fn publish(&self, event: PaymentEvent) {
        self.bus.publish(event);
    }
}
