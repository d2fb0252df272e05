use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ExecutionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }

    /// Lenient parse for status strings written by external daemons, which
    /// are not consistent about their vocabulary.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" | "waiting" => Some(ExecutionStatus::Pending),
            "running" | "in_progress" | "started" | "active" => Some(ExecutionStatus::Running),
            "completed" | "success" | "succeeded" | "done" => Some(ExecutionStatus::Completed),
            "failed" | "error" | "failure" | "cancelled" => Some(ExecutionStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = crate::error::CenterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExecutionStatus::Pending),
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            _ => Err(crate::error::CenterError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceOrigin
// ---------------------------------------------------------------------------

/// Which adapter currently owns a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    #[default]
    Unattributed,
    PollingRpc,
    FileWatcher,
    WebSocket,
}

impl SourceOrigin {
    /// Authority rank. Higher wins when sources disagree.
    pub fn priority(self) -> u8 {
        match self {
            SourceOrigin::WebSocket => 3,
            SourceOrigin::FileWatcher => 2,
            SourceOrigin::PollingRpc => 1,
            SourceOrigin::Unattributed => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceOrigin::Unattributed => "unattributed",
            SourceOrigin::PollingRpc => "polling_rpc",
            SourceOrigin::FileWatcher => "file_watcher",
            SourceOrigin::WebSocket => "web_socket",
        }
    }
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StepState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StepState {
    pub fn as_str(self) -> &'static str {
        match self {
            StepState::Pending => "pending",
            StepState::Running => "running",
            StepState::Success => "success",
            StepState::Failed => "failed",
            StepState::Skipped => "skipped",
        }
    }

    /// Map a step status string from the push stream. `completed` is the
    /// push stream's spelling of `success`.
    pub fn from_event(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(StepState::Pending),
            "running" | "started" => Some(StepState::Running),
            "success" | "completed" | "done" => Some(StepState::Success),
            "failed" | "error" => Some(StepState::Failed),
            "skipped" => Some(StepState::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunningExecution / StepStatus
// ---------------------------------------------------------------------------

/// One tracked job instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningExecution {
    pub execution_id: String,
    pub job_name: String,
    pub status: ExecutionStatus,
    pub progress_percent: u8,
    pub current_step_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_index: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub elapsed_millis: u64,
    pub source_origin: SourceOrigin,
    pub total_steps: usize,
    pub added_at_millis: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_at_millis: Option<i64>,
}

impl RunningExecution {
    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    /// Step index implied by `progress_percent` and `total_steps`, clamped to
    /// the last step. `None` when the step count is unknown.
    pub fn progress_step_index(&self, total_steps: usize) -> Option<usize> {
        if total_steps == 0 {
            return None;
        }
        let idx = (u128::from(self.progress_percent) * total_steps as u128 / 100) as usize;
        Some(idx.min(total_steps - 1))
    }
}

/// Percentage of `total` steps finished when `step_index` is the one running.
pub fn progress_percent(step_index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (step_index.min(total) as u128 * 100 / total as u128).min(100) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: StepState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StepStatus {
    pub fn pending(index: usize) -> Self {
        Self {
            index,
            name: None,
            status: StepState::Pending,
            duration_millis: None,
            error_message: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Redraw / view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedrawKind {
    #[default]
    None,
    Incremental,
    Full,
}

impl RedrawKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RedrawKind::None => "none",
            RedrawKind::Incremental => "incremental",
            RedrawKind::Full => "full",
        }
    }

    /// The more expensive of two decisions.
    pub fn max(self, other: RedrawKind) -> RedrawKind {
        fn rank(k: RedrawKind) -> u8 {
            match k {
                RedrawKind::None => 0,
                RedrawKind::Incremental => 1,
                RedrawKind::Full => 2,
            }
        }
        if rank(other) > rank(self) {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for RedrawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the view layer is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    List,
    /// Step-by-step detail of one execution.
    Detail { execution_id: String },
    /// Physics-based graph; a full redraw resets its layout simulation.
    Graph,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_is_total() {
        assert!(SourceOrigin::WebSocket.priority() > SourceOrigin::FileWatcher.priority());
        assert!(SourceOrigin::FileWatcher.priority() > SourceOrigin::PollingRpc.priority());
        assert!(SourceOrigin::PollingRpc.priority() > SourceOrigin::Unattributed.priority());
    }

    #[test]
    fn completed_step_maps_to_success() {
        assert_eq!(StepState::from_event("completed"), Some(StepState::Success));
        assert_eq!(StepState::from_event("bogus"), None);
    }

    #[test]
    fn lenient_status_parse() {
        assert_eq!(
            ExecutionStatus::parse_lenient("in_progress"),
            Some(ExecutionStatus::Running)
        );
        assert_eq!(
            ExecutionStatus::parse_lenient("Success"),
            Some(ExecutionStatus::Completed)
        );
        assert!("running".parse::<ExecutionStatus>().is_ok());
        assert!("Running".parse::<ExecutionStatus>().is_err());
    }

    #[test]
    fn progress_percent_bounds() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(2, 4), 50);
        assert_eq!(progress_percent(9, 4), 100);
    }

    #[test]
    fn view_mode_json_shape() {
        let v = ViewMode::Detail {
            execution_id: "ws-1".to_string(),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["mode"], "detail");
        assert_eq!(json["execution_id"], "ws-1");
        let parsed: ViewMode = serde_json::from_str(r#"{"mode":"graph"}"#).unwrap();
        assert_eq!(parsed, ViewMode::Graph);
    }

    #[test]
    fn redraw_max_prefers_full() {
        assert_eq!(RedrawKind::None.max(RedrawKind::Incremental), RedrawKind::Incremental);
        assert_eq!(RedrawKind::Full.max(RedrawKind::Incremental), RedrawKind::Full);
    }

    #[test]
    fn percentages_survive_huge_counts() {
        assert_eq!(progress_percent(usize::MAX, usize::MAX), 100);
        assert_eq!(progress_percent(usize::MAX / 2, usize::MAX), 49);
        assert_eq!(progress_percent(1, 4), 25);
    }
}
