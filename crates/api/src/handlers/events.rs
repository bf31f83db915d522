//! Handlers for the `/events` history resource.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use remit_db::repositories::EventRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /events`.
#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    /// Maximum number of results. Defaults to 100.
    pub limit: Option<i64>,
}

/// GET /api/v1/events
///
/// Recent lifecycle events, newest first. The live feed is served by the
/// WebSocket channel; this endpoint reads the durable log.
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventListQuery>,
) -> AppResult<impl IntoResponse> {
    let events = EventRepo::list_recent(&state.pool, params.limit.unwrap_or(100)).await?;
    Ok(Json(DataResponse { data: events }))
}
