//! Backup API Handlers

use axum::{Json, extract::State, http::StatusCode};

use crate::backup::{SchedulerStatus, SyncTrigger};
use crate::core::ServerState;
use crate::utils::{AppError, AppResponse, AppResult, ok};

/// Request a manual backup run
///
/// The run itself happens in the background; the response carries the
/// scheduler status at the moment the request was queued.
pub async fn run(
    State(state): State<ServerState>,
) -> AppResult<(StatusCode, Json<AppResponse<SchedulerStatus>>)> {
    if !state.backup.is_enabled() {
        return Err(AppError::service_unavailable(
            "Backup is not configured (BACKUP_GITHUB_TOKEN / BACKUP_GITHUB_REPO)",
        ));
    }

    state.backup.request_run(SyncTrigger::Manual);
    Ok((StatusCode::ACCEPTED, ok(state.backup.status())))
}

/// Current scheduler status, including the last run report
pub async fn status(State(state): State<ServerState>) -> Json<AppResponse<SchedulerStatus>> {
    ok(state.backup.status())
}
