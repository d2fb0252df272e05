use axum::extract::{Path, State};
use axum::Json;
use ccenter_core::paths;
use ccenter_core::Outcome;

use crate::error::AppError;
use crate::state::AppState;

/// PUT /api/watch/{id}: watch one execution's steps.
pub async fn select_watch(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Outcome>, AppError> {
    paths::validate_name(&id)?;
    let outcome = app.try_mutate(|r| r.select_watch(&id)).await?;
    Ok(Json(outcome))
}

/// DELETE /api/watch
pub async fn clear_watch(State(app): State<AppState>) -> Json<Outcome> {
    Json(app.mutate(|r| r.clear_watch()).await)
}
