//! The payment scheduler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use remit_core::event_types;
use remit_core::settings::{SchedulerSettings, SettingsPatch};
use remit_core::slots;
use remit_core::types::Timestamp;
use remit_db::models::job::NewJob;
use remit_dispatch::{BatchProgress, DispatchEngine, JobStore, StoreError};
use remit_events::{EventBus, PaymentEvent};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::source::{ClientSource, StateStore};

/// Error message recorded on jobs terminated by `stop_all`.
pub const STOP_REASON: &str = "stopped by user";

/// How often the in-memory timer is reconciled against the store.
const RECONCILE_INTERVAL: Duration = Duration::from_secs(5);

/// Number of upcoming fire times reported by `start` and `status`.
const UPCOMING_FIRES: usize = 5;

/// Scheduler operation failures.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Settings failed validation; nothing was persisted.
    #[error("Invalid settings: {0}")]
    Validation(String),

    /// A job is already in flight; the single-flight invariant rejects a
    /// second concurrent run.
    #[error("A job is already running")]
    AlreadyRunning,

    /// The state store rejected a read or write.
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}

/// Summary of the job currently in flight.
#[derive(Debug, Clone, Serialize)]
pub struct RunningJob {
    pub id: Uuid,
    pub is_scheduled: bool,
    pub started_at: Timestamp,
}

/// Snapshot returned by `status()`.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub enabled: bool,
    /// Whether the in-memory timer is currently armed.
    pub armed: bool,
    pub settings: SchedulerSettings,
    pub current_job: Option<RunningJob>,
    /// Upcoming fire times (local wall clock); empty when disarmed.
    pub next_fires: Vec<NaiveDateTime>,
}

/// Returned by `start()`: when the schedule fires next.
#[derive(Debug, Clone, Serialize)]
pub struct StartReceipt {
    pub next_fire: NaiveDateTime,
    pub upcoming: Vec<NaiveDateTime>,
}

/// Handle on a spawned background loop.
struct LoopHandle {
    cancel: CancellationToken,
}

impl LoopHandle {
    fn stop(self) {
        self.cancel.cancel();
    }
}

/// Owns recurring-run timing and single-flight job invocation.
///
/// Constructed once at process start, `initialize()`d explicitly, held by
/// the composition root and shared via `Arc`.
pub struct PaymentScheduler {
    engine: Arc<DispatchEngine>,
    jobs: Arc<dyn JobStore>,
    clients: Arc<dyn ClientSource>,
    state: Arc<dyn StateStore>,
    bus: Arc<EventBus>,
    settings: RwLock<SchedulerSettings>,
    /// Jobs currently in flight, keyed by id. The single-flight invariant
    /// keeps this at most one entry, but the map tolerates transient
    /// double-starts without losing bookkeeping.
    running: RwLock<HashMap<Uuid, RunningJob>>,
    timer: Mutex<Option<LoopHandle>>,
    reconciler: Mutex<Option<LoopHandle>>,
}

impl PaymentScheduler {
    pub fn new(
        engine: Arc<DispatchEngine>,
        jobs: Arc<dyn JobStore>,
        clients: Arc<dyn ClientSource>,
        state: Arc<dyn StateStore>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            engine,
            jobs,
            clients,
            state,
            bus,
            settings: RwLock::new(SchedulerSettings::default()),
            running: RwLock::new(HashMap::new()),
            timer: Mutex::new(None),
            reconciler: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Process-startup hook: load persisted settings, auto-arm the timer
    /// when the schedule was enabled, and start the reconciliation loop.
    ///
    /// A payment scheduler must resume across restarts without operator
    /// intervention.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), SchedulerError> {
        if let Some(persisted) = self.state.load().await? {
            let enabled = persisted.enabled;
            *self.settings.write().await = persisted;
            if enabled {
                self.arm_timer().await;
                tracing::info!("Resumed enabled schedule from persisted state");
            }
        }
        self.start_reconciler().await;
        Ok(())
    }

    /// Shut down background loops. In-flight jobs are left to finish.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.timer.lock().await.take() {
            handle.stop();
        }
        if let Some(handle) = self.reconciler.lock().await.take() {
            handle.stop();
        }
        tracing::info!("Scheduler background loops stopped");
    }

    // -----------------------------------------------------------------------
    // Control operations
    // -----------------------------------------------------------------------

    /// Validate and persist settings with `enabled = true`, arm the timer
    /// and report the upcoming fire times.
    ///
    /// Rejected with [`SchedulerError::AlreadyRunning`] while a job is in
    /// flight; with no job active a second `start` simply re-arms the
    /// timer with the new settings.
    pub async fn start(
        self: &Arc<Self>,
        settings: SchedulerSettings,
    ) -> Result<StartReceipt, SchedulerError> {
        settings
            .check()
            .map_err(|e| SchedulerError::Validation(e.to_string()))?;

        if !self.running.read().await.is_empty() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let applied = SchedulerSettings {
            enabled: true,
            ..settings
        };
        self.state.save(&applied).await?;
        *self.settings.write().await = applied.clone();
        self.arm_timer().await;

        self.bus.publish(
            PaymentEvent::new(event_types::SCHEDULER_STARTED).with_payload(
                serde_json::to_value(&applied).unwrap_or(serde_json::Value::Null),
            ),
        );
        tracing::info!(
            interval_hours = applied.interval_hours,
            batch_size = applied.batch_size,
            "Scheduler started",
        );

        let now = Local::now().naive_local();
        let upcoming = slots::upcoming_fires(now, applied.interval_hours, UPCOMING_FIRES);
        Ok(StartReceipt {
            next_fire: upcoming[0],
            upcoming,
        })
    }

    /// Disarm the timer and persist `enabled = false`.
    ///
    /// Does not touch an in-flight job. Calling `stop` when already
    /// stopped is a no-op.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let was_armed = self.disarm_timer().await;

        let snapshot = {
            let mut settings = self.settings.write().await;
            settings.enabled = false;
            settings.clone()
        };
        self.state.save(&snapshot).await?;

        if was_armed {
            self.bus
                .publish(PaymentEvent::new(event_types::SCHEDULER_STOPPED));
            tracing::info!("Scheduler stopped");
        }
        Ok(())
    }

    /// Run one job immediately, independent of the timer and the enabled
    /// flag. Rejected while another job is in flight.
    pub async fn run_manual(self: &Arc<Self>) -> Result<Uuid, SchedulerError> {
        self.spawn_job(false).await
    }

    /// Disarm the timer, terminate tracking of any in-flight job (marking
    /// it failed with a fixed reason) and persist `enabled = false`.
    ///
    /// Outstanding network calls are not interrupted; their outcomes are
    /// discarded once the job is no longer tracked.
    pub async fn stop_all(&self) -> Result<(), SchedulerError> {
        self.disarm_timer().await;

        let drained: Vec<RunningJob> = {
            let mut running = self.running.write().await;
            running.drain().map(|(_, job)| job).collect()
        };
        for job in &drained {
            if let Err(e) = self.jobs.fail(job.id, STOP_REASON).await {
                tracing::error!(job_id = %job.id, error = %e, "Failed to mark stopped job");
            }
            self.bus.publish(
                PaymentEvent::new(event_types::JOB_FAILED)
                    .with_job(job.id)
                    .with_payload(serde_json::json!({ "error": STOP_REASON })),
            );
            tracing::info!(job_id = %job.id, "Job stopped by user");
        }

        let snapshot = {
            let mut settings = self.settings.write().await;
            settings.enabled = false;
            settings.clone()
        };
        self.state.save(&snapshot).await?;

        self.bus
            .publish(PaymentEvent::new(event_types::SCHEDULER_STOPPED));
        Ok(())
    }

    /// Merge a partial update into the current settings and persist it.
    /// When the schedule is enabled the timer is re-armed so the new
    /// interval takes effect immediately.
    pub async fn update_settings(
        self: &Arc<Self>,
        patch: SettingsPatch,
    ) -> Result<SchedulerSettings, SchedulerError> {
        let merged = self.settings.read().await.merged(&patch);
        merged
            .check()
            .map_err(|e| SchedulerError::Validation(e.to_string()))?;

        self.state.save(&merged).await?;
        *self.settings.write().await = merged.clone();

        if merged.enabled {
            self.arm_timer().await;
        }

        self.bus.publish(
            PaymentEvent::new(event_types::SETTINGS_UPDATED)
                .with_payload(serde_json::to_value(&merged).unwrap_or(serde_json::Value::Null)),
        );
        tracing::info!(
            interval_hours = merged.interval_hours,
            batch_size = merged.batch_size,
            include_inactive = merged.include_inactive,
            "Settings updated",
        );
        Ok(merged)
    }

    /// Current state, reconciled against the store first so the answer
    /// always reflects reality.
    pub async fn status(self: &Arc<Self>) -> SchedulerStatus {
        if let Err(e) = self.reconcile().await {
            tracing::warn!(error = %e, "Status reconciliation failed, reporting in-memory state");
        }

        let settings = self.settings.read().await.clone();
        let armed = self.timer.lock().await.is_some();
        let current_job = self.running.read().await.values().next().cloned();
        let next_fires = if armed {
            slots::upcoming_fires(
                Local::now().naive_local(),
                settings.interval_hours,
                UPCOMING_FIRES,
            )
        } else {
            Vec::new()
        };

        SchedulerStatus {
            enabled: settings.enabled,
            armed,
            settings,
            current_job,
            next_fires,
        }
    }

    /// One reconciliation step: re-read the persisted enable-state and
    /// arm/disarm the in-memory timer if it disagrees. Guards against
    /// multi-process or restart drift.
    pub async fn reconcile(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let Some(persisted) = self.state.load().await? else {
            return Ok(());
        };

        let armed = self.timer.lock().await.is_some();
        if persisted.enabled && !armed {
            *self.settings.write().await = persisted;
            self.arm_timer().await;
            tracing::info!("Reconciliation armed the timer from persisted state");
        } else if !persisted.enabled && armed {
            self.disarm_timer().await;
            let mut settings = self.settings.write().await;
            settings.enabled = false;
            tracing::info!("Reconciliation disarmed the timer");
        }
        Ok(())
    }

    /// Start the periodic reconciliation loop.
    async fn start_reconciler(self: &Arc<Self>) {
        let cancel = CancellationToken::new();
        let this = Arc::clone(self);
        let loop_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RECONCILE_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = this.reconcile().await {
                            tracing::error!(error = %e, "Reconciliation cycle failed");
                        }
                    }
                }
            }
        });

        let mut guard = self.reconciler.lock().await;
        if let Some(previous) = guard.replace(LoopHandle { cancel }) {
            previous.stop();
        }
    }

    // -----------------------------------------------------------------------
    // Timer internals
    // -----------------------------------------------------------------------

    /// (Re-)arm the recurring timer. Any previous timer is cancelled.
    async fn arm_timer(self: &Arc<Self>) {
        let cancel = CancellationToken::new();
        let this = Arc::clone(self);
        let loop_cancel = cancel.clone();
        tokio::spawn(async move {
            this.timer_loop(loop_cancel).await;
        });

        let mut guard = self.timer.lock().await;
        if let Some(previous) = guard.replace(LoopHandle { cancel }) {
            previous.stop();
        }
    }

    /// Disarm the timer. Returns whether it was armed.
    async fn disarm_timer(&self) -> bool {
        match self.timer.lock().await.take() {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Sleep until the next fire slot, fire, repeat.
    async fn timer_loop(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            let interval_hours = self.settings.read().await.interval_hours;
            let now = Local::now().naive_local();
            let next = slots::next_fire(now, interval_hours);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next_fire = %next, "Timer sleeping until next fire slot");

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Timer loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    self.on_fire().await;
                }
            }
        }
    }

    /// Timer fire: run a scheduled job, or skip when one is in flight.
    /// Scheduled runs are never queued.
    async fn on_fire(self: &Arc<Self>) {
        match self.spawn_job(true).await {
            Ok(job_id) => {
                tracing::info!(job_id = %job_id, "Scheduled run fired");
            }
            Err(SchedulerError::AlreadyRunning) => {
                tracing::warn!("Scheduled fire skipped, a job is still running");
                self.bus.publish(
                    PaymentEvent::new(event_types::JOB_SKIPPED)
                        .with_payload(serde_json::json!({ "reason": "previous job still running" })),
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduled fire failed to start a job");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Job execution
    // -----------------------------------------------------------------------

    /// Claim the single-flight slot and spawn a job task.
    async fn spawn_job(self: &Arc<Self>, is_scheduled: bool) -> Result<Uuid, SchedulerError> {
        let job_id = Uuid::new_v4();
        {
            let mut running = self.running.write().await;
            if !running.is_empty() {
                return Err(SchedulerError::AlreadyRunning);
            }
            running.insert(
                job_id,
                RunningJob {
                    id: job_id,
                    is_scheduled,
                    started_at: chrono::Utc::now(),
                },
            );
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_job(job_id, is_scheduled).await;
        });
        Ok(job_id)
    }

    /// Drive one job to a terminal state and release the running slot.
    ///
    /// A failed run terminates that job only; the timer stays armed for
    /// the next slot.
    async fn run_job(self: Arc<Self>, job_id: Uuid, is_scheduled: bool) {
        let settings = self.settings.read().await.clone();

        if let Err(error) = self.execute_job(job_id, is_scheduled, &settings).await {
            tracing::error!(job_id = %job_id, error = %error, "Job failed");
            if let Err(e) = self.jobs.fail(job_id, &error).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to record job failure");
            }
            self.bus.publish(
                PaymentEvent::new(event_types::JOB_FAILED)
                    .with_job(job_id)
                    .with_payload(serde_json::json!({ "error": error })),
            );
        }

        self.running.write().await.remove(&job_id);
    }

    /// Fetch clients, create the job row and run the dispatch engine.
    async fn execute_job(
        &self,
        job_id: Uuid,
        is_scheduled: bool,
        settings: &SchedulerSettings,
    ) -> Result<(), String> {
        let clients = match self.clients.list_clients(settings.include_inactive).await {
            Ok(clients) => clients,
            Err(e) => {
                // Record the aborted job so the failure is visible in history.
                let _ = self
                    .jobs
                    .create(&NewJob {
                        id: job_id,
                        total_count: 0,
                        batch_size: settings.batch_size as i32,
                        include_inactive: settings.include_inactive,
                        is_scheduled,
                    })
                    .await;
                return Err(format!("client source: {e}"));
            }
        };

        self.jobs
            .create(&NewJob {
                id: job_id,
                total_count: clients.len() as i32,
                batch_size: settings.batch_size as i32,
                include_inactive: settings.include_inactive,
                is_scheduled,
            })
            .await
            .map_err(|e| format!("job store: {e}"))?;

        let report = self
            .engine
            .run(job_id, clients, settings.batch_size as usize)
            .await
            .map_err(|e| e.to_string())?;

        if report.abandoned {
            tracing::info!(job_id = %job_id, "Run abandoned, leaving job record as-is");
            return Ok(());
        }

        self.jobs
            .complete(job_id, &BatchProgress::from_stats(&report.stats), &report.stats)
            .await
            .map_err(|e| format!("job store: {e}"))?;
        Ok(())
    }
}
