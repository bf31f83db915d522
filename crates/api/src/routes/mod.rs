//! Route tree for the control plane.

pub mod health;
pub mod jobs;
pub mod scheduler;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /scheduler/start       arm the recurring schedule (POST)
/// /scheduler/stop        disarm (POST)
/// /scheduler/run         manual run (POST)
/// /scheduler/stop-all    disarm and terminate in-flight jobs (POST)
/// /scheduler/settings    partial settings update (PATCH)
/// /scheduler/status      enabled/armed/current job/next fires (GET)
///
/// /jobs                  job history (GET, ?limit&offset)
/// /jobs/{id}             one job (GET)
///
/// /events                durable event log (GET, ?limit)
/// /events/ws             WebSocket event push channel
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/scheduler", scheduler::router())
        .nest("/jobs", jobs::router())
        .route("/events", get(crate::handlers::events::list_events))
        .route("/events/ws", get(ws::events_ws))
}

/// The full application router: health at the root, everything else
/// under `/api/v1`.
pub fn app() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1", api_routes())
}
