use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Outer message enum ───────────────────────────────────────────────────

/// Every message pushed by the skill execution stream.
/// Discriminated by the JSON `"type"` field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillMessage {
    SkillStarted(SkillStarted),
    SkillProgress(SkillProgress),
    StepUpdate(StepUpdate),
    SkillCompleted(SkillCompleted),
    Heartbeat,
    /// Any message type this client does not know about.
    #[serde(other)]
    Unknown,
}

impl SkillMessage {
    pub fn execution_id(&self) -> Option<&str> {
        match self {
            SkillMessage::SkillStarted(m) => Some(&m.execution_id),
            SkillMessage::SkillProgress(m) => Some(&m.execution_id),
            SkillMessage::StepUpdate(m) => Some(&m.execution_id),
            SkillMessage::SkillCompleted(m) => Some(&m.execution_id),
            SkillMessage::Heartbeat | SkillMessage::Unknown => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SkillMessage::SkillStarted(_) => "skill_started",
            SkillMessage::SkillProgress(_) => "skill_progress",
            SkillMessage::StepUpdate(_) => "step_update",
            SkillMessage::SkillCompleted(_) => "skill_completed",
            SkillMessage::Heartbeat => "heartbeat",
            SkillMessage::Unknown => "unknown",
        }
    }
}

// ─── Payloads ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SkillStarted {
    #[serde(alias = "executionId")]
    pub execution_id: String,
    #[serde(alias = "skillName", alias = "job_name")]
    pub skill_name: String,
    #[serde(default, alias = "startedAt", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "totalSteps")]
    pub total_steps: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SkillProgress {
    #[serde(alias = "executionId")]
    pub execution_id: String,
    #[serde(alias = "currentStepIndex", alias = "step_index")]
    pub current_step_index: usize,
    #[serde(default, alias = "totalSteps")]
    pub total_steps: usize,
    #[serde(
        default,
        alias = "currentStepLabel",
        alias = "step_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_step_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StepUpdate {
    #[serde(alias = "executionId")]
    pub execution_id: String,
    #[serde(alias = "stepIndex")]
    pub step_index: usize,
    /// `pending`, `running`, `success`/`completed`, `failed` or `skipped`.
    pub status: String,
    #[serde(
        default,
        alias = "durationMillis",
        alias = "duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_millis: Option<u64>,
    #[serde(
        default,
        alias = "errorMessage",
        alias = "error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SkillCompleted {
    #[serde(alias = "executionId")]
    pub execution_id: String,
    pub success: bool,
}
