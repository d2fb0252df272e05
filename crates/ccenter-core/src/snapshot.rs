//! Snapshot shapes reported by the poll-based sources: the execution-state
//! file persisted by the skill daemon, and the `{ success, data, error }`
//! envelope returned by daemon calls.

use crate::error::{CenterError, Result};
use crate::registry::ExecutionUpdate;
use crate::types::{progress_percent, ExecutionStatus, SourceOrigin};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// SnapshotItem
// ---------------------------------------------------------------------------

/// One execution as seen by a poll-based source. Field names follow the
/// daemon's spelling; camelCase variants are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotItem {
    #[serde(default, alias = "executionId", alias = "id")]
    pub execution_id: Option<String>,
    #[serde(alias = "jobName", alias = "skill_name", alias = "skillName")]
    pub job_name: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, alias = "currentStepIndex", alias = "current_step")]
    pub current_step_index: Option<usize>,
    #[serde(default, alias = "currentStepLabel", alias = "current_step_name")]
    pub current_step_label: Option<String>,
    #[serde(default, alias = "totalSteps")]
    pub total_steps: Option<usize>,
    #[serde(default, alias = "elapsedMillis", alias = "elapsed_ms")]
    pub elapsed_millis: Option<u64>,
    #[serde(default, alias = "startedAt", alias = "start_time")]
    pub started_at: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    "running".to_string()
}

impl SnapshotItem {
    /// Convert into a registry update. Items without an id get one derived
    /// from the origin, job and (when known) start time, so repeated polls of
    /// the same run agree.
    pub fn into_update(self, origin: SourceOrigin) -> ExecutionUpdate {
        let execution_id = match self.execution_id.filter(|s| !s.is_empty()) {
            Some(id) => id,
            None => match self.started_at {
                Some(at) => format!("{}:{}:{}", origin, self.job_name, at.timestamp_millis()),
                None => format!("{}:{}", origin, self.job_name),
            },
        };
        let status = ExecutionStatus::parse_lenient(&self.status);
        let progress = match (self.current_step_index, self.total_steps) {
            (Some(i), Some(t)) if t > 0 => Some(progress_percent(i, t)),
            _ => None,
        };
        ExecutionUpdate {
            execution_id,
            job_name: Some(self.job_name),
            status,
            progress_percent: progress,
            current_step_label: self.current_step_label,
            current_step_index: self.current_step_index,
            started_at: self.started_at,
            elapsed_millis: self.elapsed_millis,
            total_steps: self.total_steps,
        }
    }
}

// ---------------------------------------------------------------------------
// Execution-state file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StateFile {
    Keyed {
        executions: BTreeMap<String, SnapshotItem>,
    },
    Listed {
        executions: Vec<SnapshotItem>,
    },
    Bare(Vec<SnapshotItem>),
}

/// Parse the execution-state file. Keyed maps fill missing ids from the key.
pub fn parse_state_file(data: &str) -> Result<Vec<SnapshotItem>> {
    let file: StateFile = serde_json::from_str(data)?;
    let items = match file {
        StateFile::Keyed { executions } => executions
            .into_iter()
            .map(|(key, mut item)| {
                if item.execution_id.is_none() {
                    item.execution_id = Some(key);
                }
                item
            })
            .collect(),
        StateFile::Listed { executions } => executions,
        StateFile::Bare(items) => items,
    };
    Ok(items)
}

pub fn read_state_file(path: &Path) -> Result<Vec<SnapshotItem>> {
    let data = std::fs::read_to_string(path)?;
    parse_state_file(&data)
}

// ---------------------------------------------------------------------------
// Daemon response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> RpcResponse<T> {
    pub fn into_result(self) -> Result<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(CenterError::Rpc(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_state_file_fills_ids_from_keys() {
        let data = r#"{
            "executions": {
                "exec-1": {
                    "skillName": "deploy-prod",
                    "status": "in_progress",
                    "currentStepIndex": 2,
                    "totalSteps": 4,
                    "startedAt": "2026-01-01T00:00:00Z"
                }
            }
        }"#;
        let items = parse_state_file(data).unwrap();
        assert_eq!(items.len(), 1);
        let update = items[0].clone().into_update(SourceOrigin::FileWatcher);
        assert_eq!(update.execution_id, "exec-1");
        assert_eq!(update.job_name.as_deref(), Some("deploy-prod"));
        assert_eq!(update.status, Some(ExecutionStatus::Running));
        assert_eq!(update.progress_percent, Some(50));
    }

    #[test]
    fn bare_list_is_accepted() {
        let data = r#"[{"job_name": "lint", "status": "completed"}]"#;
        let items = parse_state_file(data).unwrap();
        let update = items[0].clone().into_update(SourceOrigin::FileWatcher);
        assert_eq!(update.status, Some(ExecutionStatus::Completed));
        assert_eq!(update.execution_id, "file_watcher:lint");
    }

    #[test]
    fn derived_id_without_start_time_is_stable() {
        let item = SnapshotItem {
            job_name: "nightly".to_string(),
            ..Default::default()
        };
        let a = item.clone().into_update(SourceOrigin::PollingRpc);
        let b = item.into_update(SourceOrigin::PollingRpc);
        assert_eq!(a.execution_id, b.execution_id);
    }

    #[test]
    fn derived_id_is_stable_when_start_time_is_known() {
        let item = SnapshotItem {
            job_name: "lint".to_string(),
            started_at: Some("2026-01-01T00:00:00Z".parse().unwrap()),
            ..Default::default()
        };
        let a = item.clone().into_update(SourceOrigin::PollingRpc);
        let b = item.into_update(SourceOrigin::PollingRpc);
        assert_eq!(a.execution_id, b.execution_id);
    }

    #[test]
    fn rpc_envelope_success_and_failure() {
        let ok: RpcResponse<SnapshotItem> =
            serde_json::from_str(r#"{"success": true, "data": {"job_name": "x"}}"#).unwrap();
        assert_eq!(ok.into_result().unwrap().unwrap().job_name, "x");

        let empty: RpcResponse<SnapshotItem> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(empty.into_result().unwrap().is_none());

        let err: RpcResponse<SnapshotItem> =
            serde_json::from_str(r#"{"success": false, "error": "daemon down"}"#).unwrap();
        assert!(matches!(err.into_result(), Err(CenterError::Rpc(m)) if m == "daemon down"));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_state_file("not json").is_err());
    }
}
