//! End-to-end dispatch engine scenarios against an in-memory job store
//! and a scripted submitter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use remit_core::stats::{Endpoint, ErrorKind, JobStats};
use remit_db::models::client::Client;
use remit_db::models::job::NewJob;
use remit_dispatch::{
    BatchProgress, DispatchEngine, DispatchError, EngineConfig, JobStore, StoreError,
};
use remit_events::{EventBus, PaymentEvent};
use remit_gateway::client::{GatewayError, PaymentSubmitter};
use remit_gateway::token::TokenError;
use remit_gateway::SubmissionOutcome;
use tokio::sync::Mutex;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

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

fn clients(n: i64) -> Vec<Client> {
    (1..=n).map(client).collect()
}

/// Submitter that fails each subscriber a scripted number of times before
/// succeeding, counting every attempt.
struct ScriptedSubmitter {
    /// Failures before success, per subscriber. Missing = always succeed.
    fail_times: HashMap<String, u32>,
    attempts: Mutex<HashMap<String, u32>>,
    kind: ErrorKind,
}

impl ScriptedSubmitter {
    fn succeeding() -> Self {
        Self::with_failures(HashMap::new())
    }

    fn with_failures(fail_times: HashMap<String, u32>) -> Self {
        Self {
            fail_times,
            attempts: Mutex::new(HashMap::new()),
            kind: ErrorKind::ServerError,
        }
    }

    async fn attempts_for(&self, subscriber_no: &str) -> u32 {
        self.attempts
            .lock()
            .await
            .get(subscriber_no)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PaymentSubmitter for ScriptedSubmitter {
    async fn submit(&self, client: &Client) -> Result<SubmissionOutcome, GatewayError> {
        let attempt = {
            let mut attempts = self.attempts.lock().await;
            let counter = attempts.entry(client.subscriber_no.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        let budget = self
            .fail_times
            .get(&client.subscriber_no)
            .copied()
            .unwrap_or(0);

        if attempt <= budget {
            Ok(SubmissionOutcome::Failure {
                endpoint: Endpoint::Fallback,
                latency_ms: 3,
                kind: self.kind,
                message: format!("scripted failure {attempt}"),
            })
        } else {
            Ok(SubmissionOutcome::Success {
                endpoint: Endpoint::Primary,
                latency_ms: 5,
                status_code: 200,
                description: "accepted".into(),
            })
        }
    }
}

/// Submitter whose token provider is permanently down.
struct DeadUpstream;

#[async_trait]
impl PaymentSubmitter for DeadUpstream {
    async fn submit(&self, _client: &Client) -> Result<SubmissionOutcome, GatewayError> {
        Err(GatewayError::Token(TokenError::Rejected(503)))
    }
}

/// In-memory job store recording every call.
#[derive(Default)]
struct MemoryJobStore {
    progress_calls: AtomicU32,
    completed: AtomicBool,
    /// When set, `record_progress` reports the job as no longer tracked.
    stop_tracking: AtomicBool,
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, _job: &NewJob) -> Result<(), StoreError> {
        Ok(())
    }

    async fn record_progress(
        &self,
        _job_id: Uuid,
        _progress: &BatchProgress,
    ) -> Result<bool, StoreError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        Ok(!self.stop_tracking.load(Ordering::SeqCst))
    }

    async fn complete(
        &self,
        _job_id: Uuid,
        _progress: &BatchProgress,
        _stats: &JobStats,
    ) -> Result<(), StoreError> {
        self.completed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fail(&self, _job_id: Uuid, _error: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

struct Harness {
    engine: DispatchEngine,
    store: Arc<MemoryJobStore>,
    bus: Arc<EventBus>,
}

fn harness(submitter: Arc<dyn PaymentSubmitter>) -> Harness {
    let store = Arc::new(MemoryJobStore::default());
    let bus = Arc::new(EventBus::default());
    let engine = DispatchEngine::with_config(
        submitter,
        Arc::clone(&store) as Arc<dyn JobStore>,
        Arc::clone(&bus),
        EngineConfig {
            max_retries: 3,
            batch_delay: Duration::ZERO,
        },
    );
    Harness { engine, store, bus }
}

/// Drain everything currently buffered on a subscription.
fn drain(rx: &mut tokio::sync::broadcast::Receiver<PaymentEvent>) -> Vec<PaymentEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn events_of<'a>(events: &'a [PaymentEvent], event_type: &str) -> Vec<&'a PaymentEvent> {
    events
        .iter()
        .filter(|e| e.event_type == event_type)
        .collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_clients_completes_immediately_with_zero_stats() {
    let h = harness(Arc::new(ScriptedSubmitter::succeeding()));
    let mut rx = h.bus.subscribe();

    let report = h.engine.run(Uuid::new_v4(), vec![], 10).await.unwrap();

    assert_eq!(report.batches, 0);
    assert_eq!(report.stats.attempted, 0);
    assert_eq!(report.stats.successful, 0);
    assert_eq!(report.stats.failed, 0);
    assert!(report.outcomes.is_empty());
    assert!(!report.abandoned);

    let events = drain(&mut rx);
    assert_eq!(events_of(&events, "job.started").len(), 1);
    assert_eq!(events_of(&events, "job.completed").len(), 1);
    assert!(events_of(&events, "batch.started").is_empty());
}

#[tokio::test]
async fn ten_clients_batch_four_runs_three_batches() {
    let h = harness(Arc::new(ScriptedSubmitter::succeeding()));
    let mut rx = h.bus.subscribe();

    let report = h.engine.run(Uuid::new_v4(), clients(10), 4).await.unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(report.stats.successful, 10);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.stats.retried, 0);
    assert_eq!(report.stats.attempted, 10);
    assert_eq!(h.store.progress_calls.load(Ordering::SeqCst), 3);

    let events = drain(&mut rx);
    let started = events_of(&events, "batch.started");
    assert_eq!(started.len(), 3);
    let sizes: Vec<u64> = started
        .iter()
        .map(|e| {
            e.payload["retry_count"].as_u64().unwrap() + e.payload["fresh_count"].as_u64().unwrap()
        })
        .collect();
    assert_eq!(sizes, vec![4, 4, 2]);
    assert_eq!(events_of(&events, "job.completed").len(), 1);
}

#[tokio::test]
async fn transient_failures_recover_on_retry() {
    // All five clients fail their first attempt and succeed on the retry.
    let fail_times = (1..=5).map(|i| (format!("SUB{i:04}"), 1)).collect();
    let h = harness(Arc::new(ScriptedSubmitter::with_failures(fail_times)));
    let mut rx = h.bus.subscribe();

    let report = h.engine.run(Uuid::new_v4(), clients(5), 5).await.unwrap();

    assert_eq!(report.batches, 2, "one initial batch plus one retry batch");
    assert_eq!(report.stats.successful, 5);
    assert_eq!(report.stats.failed, 5);
    assert_eq!(report.stats.retried, 5);
    assert_eq!(report.stats.permanent_failures(), 0);
    assert_eq!(report.stats.attempted, 10);

    let events = drain(&mut rx);
    let started = events_of(&events, "batch.started");
    assert_eq!(started[1].payload["retry_count"], 5);
    assert_eq!(started[1].payload["fresh_count"], 0);
}

#[tokio::test]
async fn retry_cap_bounds_total_attempts() {
    let fail_times = HashMap::from([("SUB0001".to_string(), u32::MAX)]);
    let submitter = Arc::new(ScriptedSubmitter::with_failures(fail_times));
    let h = harness(Arc::clone(&submitter) as Arc<dyn PaymentSubmitter>);

    let report = h.engine.run(Uuid::new_v4(), clients(1), 5).await.unwrap();

    // max_retries = 3: exactly 4 attempts, never more.
    assert_eq!(submitter.attempts_for("SUB0001").await, 4);
    assert_eq!(report.stats.failed, 4);
    assert_eq!(report.stats.retried, 3);
    assert_eq!(report.stats.successful, 0);
    assert_eq!(report.stats.permanent_failures(), 1);
    assert_eq!(report.batches, 4);
}

#[tokio::test]
async fn retries_are_prioritized_over_fresh_items() {
    // Three clients, batch size two. SUB0001 fails its first attempt, so
    // the second batch must lead with its retry ahead of fresh SUB0003.
    let fail_times = HashMap::from([("SUB0001".to_string(), 1)]);
    let h = harness(Arc::new(ScriptedSubmitter::with_failures(fail_times)));
    let mut rx = h.bus.subscribe();

    let report = h.engine.run(Uuid::new_v4(), clients(3), 2).await.unwrap();
    assert_eq!(report.batches, 2);

    let events = drain(&mut rx);
    let started = events_of(&events, "batch.started");
    assert_eq!(started[1].payload["retry_count"], 1);
    assert_eq!(started[1].payload["fresh_count"], 1);

    assert_eq!(report.stats.successful, 3);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.retried, 1);
}

#[tokio::test]
async fn attempt_accounting_matches_batch_events() {
    let fail_times = HashMap::from([
        ("SUB0002".to_string(), 2),
        ("SUB0005".to_string(), u32::MAX),
    ]);
    let h = harness(Arc::new(ScriptedSubmitter::with_failures(fail_times)));
    let mut rx = h.bus.subscribe();

    let report = h.engine.run(Uuid::new_v4(), clients(6), 3).await.unwrap();

    let events = drain(&mut rx);
    let settled: u64 = events_of(&events, "batch.completed")
        .iter()
        .map(|e| {
            e.payload["successes"].as_u64().unwrap() + e.payload["failures"].as_u64().unwrap()
        })
        .sum();
    assert_eq!(settled, report.stats.attempted);
    assert_eq!(
        report.stats.attempted,
        report.stats.successful + report.stats.failed
    );
    assert!(report.stats.permanent_failures() <= report.stats.failed);
    // SUB0005 exhausted its budget; SUB0002 recovered.
    assert_eq!(report.stats.permanent_failures(), 1);
    assert_eq!(report.stats.successful, 5);
}

#[tokio::test]
async fn abandoned_run_stops_emitting_and_discards_remaining_work() {
    let h = harness(Arc::new(ScriptedSubmitter::succeeding()));
    h.store.stop_tracking.store(true, Ordering::SeqCst);
    let mut rx = h.bus.subscribe();

    let report = h.engine.run(Uuid::new_v4(), clients(10), 4).await.unwrap();

    assert!(report.abandoned);
    assert_eq!(report.batches, 1, "run stops at the first batch boundary");

    let events = drain(&mut rx);
    assert!(events_of(&events, "job.completed").is_empty());
    assert!(events_of(&events, "batch.completed").is_empty());
}

#[tokio::test]
async fn dead_upstream_aborts_the_job() {
    let h = harness(Arc::new(DeadUpstream));
    let result = h.engine.run(Uuid::new_v4(), clients(3), 3).await;
    assert_matches!(result, Err(DispatchError::Upstream(_)));
    assert!(!h.store.completed.load(Ordering::SeqCst));
}
