use axum::extract::{Path, State};
use axum::Json;
use ccenter_core::paths;
use ccenter_core::types::{RunningExecution, StepStatus};
use ccenter_core::Outcome;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/running: every tracked execution.
pub async fn list_running(State(app): State<AppState>) -> Json<Vec<RunningExecution>> {
    let r = app.reconciler.lock().await;
    Json(r.running_list())
}

/// GET /api/running/{id}/steps: step array of the watched execution.
pub async fn get_steps(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StepStatus>>, AppError> {
    paths::validate_name(&id)?;
    let r = app.reconciler.lock().await;
    let steps = r
        .step_statuses(&id)
        .ok_or_else(|| AppError::not_found(format!("execution '{id}' is not being watched")))?;
    Ok(Json(steps.to_vec()))
}

/// DELETE /api/running/{id}
pub async fn clear_execution(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Outcome>, AppError> {
    paths::validate_name(&id)?;
    Ok(Json(app.mutate(|r| r.clear_execution(&id)).await))
}

/// POST /api/running/clear-stale
pub async fn clear_stale(State(app): State<AppState>) -> Json<Outcome> {
    Json(app.mutate(|r| r.clear_stale_running()).await)
}
