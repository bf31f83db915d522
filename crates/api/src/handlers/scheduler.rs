//! Handlers for the `/scheduler` control surface.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use remit_core::settings::{SchedulerSettings, SettingsPatch};
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /scheduler/start`.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub interval_hours: u32,
    pub batch_size: u32,
    #[serde(default)]
    pub include_inactive: bool,
}

// ---------------------------------------------------------------------------
// Start / stop
// ---------------------------------------------------------------------------

/// POST /api/v1/scheduler/start
///
/// Validate the settings, persist them with `enabled = true` and arm the
/// recurring timer. Returns the next fire time and the upcoming five fire
/// times. 409 when a job is currently in flight, 400 on invalid settings.
pub async fn start(
    State(state): State<AppState>,
    Json(input): Json<StartRequest>,
) -> AppResult<impl IntoResponse> {
    let receipt = state
        .scheduler
        .start(SchedulerSettings {
            interval_hours: input.interval_hours,
            batch_size: input.batch_size,
            include_inactive: input.include_inactive,
            enabled: false,
        })
        .await?;

    Ok(Json(DataResponse { data: receipt }))
}

/// POST /api/v1/scheduler/stop
///
/// Disarm the timer and persist `enabled = false`. Leaves an in-flight
/// job untouched. Idempotent; returns 204.
pub async fn stop(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    state.scheduler.stop().await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Manual runs
// ---------------------------------------------------------------------------

/// POST /api/v1/scheduler/run
///
/// Start one manual job immediately, independent of the timer state.
/// Returns 202 with the new job id, or 409 while a job is in flight.
pub async fn run_manual(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let job_id = state.scheduler.run_manual().await?;

    tracing::info!(job_id = %job_id, "Manual run accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: serde_json::json!({ "job_id": job_id }),
        }),
    ))
}

/// POST /api/v1/scheduler/stop-all
///
/// Disarm the timer and terminate tracking of any in-flight job, marking
/// it failed. Returns 204.
pub async fn stop_all(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    state.scheduler.stop_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Settings / status
// ---------------------------------------------------------------------------

/// PATCH /api/v1/scheduler/settings
///
/// Merge a partial update into the current settings. Re-arms the timer
/// when the schedule is enabled. 400 when the merged settings are out of
/// bounds.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> AppResult<impl IntoResponse> {
    let settings = state.scheduler.update_settings(patch).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// GET /api/v1/scheduler/status
///
/// Enabled/armed flags, current settings, the in-flight job (if any) and
/// the upcoming fire times, reconciled against the persisted state.
pub async fn status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let status = state.scheduler.status().await;
    Ok(Json(DataResponse { data: status }))
}
