use axum::extract::{Path, State};
use axum::Json;
use ccenter_core::paths;
use ccenter_core::Outcome;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/jobs/{name}/open: open a job's detail, watching its running
/// execution if it has one.
pub async fn open_job(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Outcome>, AppError> {
    paths::validate_name(&name)?;
    Ok(Json(app.mutate(|r| r.view_job(&name)).await))
}
