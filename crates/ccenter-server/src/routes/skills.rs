use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct SkillSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<String>,
}

/// GET /api/skills: loaded skill definitions.
pub async fn list_skills(State(app): State<AppState>) -> Json<Vec<SkillSummary>> {
    let r = app.reconciler.lock().await;
    let skills = r
        .catalog()
        .iter()
        .map(|def| SkillSummary {
            name: def.name.clone(),
            description: def.description.clone(),
            steps: def.steps.iter().map(|s| s.name.clone()).collect(),
        })
        .collect();
    Json(skills)
}
