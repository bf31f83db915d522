use std::sync::Arc;

use remit_scheduler::PaymentScheduler;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: remit_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The scheduler owning recurring timing and job invocation.
    pub scheduler: Arc<PaymentScheduler>,
    /// Centralized event bus for the push channel.
    pub event_bus: Arc<remit_events::EventBus>,
}
