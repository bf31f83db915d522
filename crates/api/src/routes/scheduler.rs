//! Route definitions for the `/scheduler` control surface.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::scheduler;
use crate::state::AppState;

/// Routes mounted at `/scheduler`.
///
/// ```text
/// POST   /start       -> start
/// POST   /stop        -> stop
/// POST   /run         -> run_manual
/// POST   /stop-all    -> stop_all
/// PATCH  /settings    -> update_settings
/// GET    /status      -> status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(scheduler::start))
        .route("/stop", post(scheduler::stop))
        .route("/run", post(scheduler::run_manual))
        .route("/stop-all", post(scheduler::stop_all))
        .route("/settings", patch(scheduler::update_settings))
        .route("/status", get(scheduler::status))
}
