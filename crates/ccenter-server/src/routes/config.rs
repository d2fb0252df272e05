use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: the effective configuration the server started with,
/// plus any validation warnings.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let config = serde_json::to_value(app.config.as_ref())?;
    let warnings = serde_json::to_value(app.config.validate())?;
    Ok(Json(serde_json::json!({
        "config": config,
        "warnings": warnings,
    })))
}
