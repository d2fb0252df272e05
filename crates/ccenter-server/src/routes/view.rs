use axum::extract::State;
use axum::Json;
use ccenter_core::types::ViewMode;
use ccenter_core::Outcome;

use crate::state::AppState;

/// PUT /api/view: tell the reconciler what the view is showing.
///
/// Body is a tagged mode, e.g. `{"mode":"detail","execution_id":"ws-1"}`.
pub async fn set_view(State(app): State<AppState>, Json(view): Json<ViewMode>) -> Json<Outcome> {
    Json(app.mutate(|r| r.set_view(view)).await)
}

/// GET /api/view
pub async fn get_view(State(app): State<AppState>) -> Json<serde_json::Value> {
    let r = app.reconciler.lock().await;
    Json(serde_json::json!({
        "view": r.view(),
        "watched": r.watched(),
    }))
}
