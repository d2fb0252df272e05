//! Snapshot adapter over the execution-state file the skill daemon persists.

use ccenter_core::snapshot;
use ccenter_core::types::SourceOrigin;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::state::AppState;

pub fn spawn(state: AppState, path: PathBuf, interval: Duration) {
    tokio::spawn(async move {
        let mut last_mtime = None::<SystemTime>;
        loop {
            tokio::time::sleep(interval).await;
            poll_once(&state, &path, &mut last_mtime).await;
        }
    });
}

/// Check `path` once. When its mtime moved, parse it and hand the list to the
/// reconciler. Missing or unparseable files are no update. Returns whether a
/// snapshot was applied.
pub async fn poll_once(state: &AppState, path: &Path, last_mtime: &mut Option<SystemTime>) -> bool {
    let Ok(meta) = tokio::fs::metadata(path).await else {
        return false;
    };
    let Ok(mtime) = meta.modified() else {
        return false;
    };
    if *last_mtime == Some(mtime) {
        return false;
    }
    *last_mtime = Some(mtime);

    let data = match tokio::fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file unreadable");
            return false;
        }
    };
    let items = match snapshot::parse_state_file(&data) {
        Ok(items) => items,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file unparseable");
            return false;
        }
    };
    debug!(path = %path.display(), count = items.len(), "state file snapshot");
    state
        .mutate(|r| r.on_snapshot(SourceOrigin::FileWatcher, items))
        .await;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccenter_core::clock::ManualClock;
    use ccenter_core::config::Config;
    use ccenter_core::skill::SkillCatalog;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn state() -> AppState {
        AppState::with_clock(
            PathBuf::from("/tmp/test"),
            Config::default(),
            SkillCatalog::default(),
            Arc::new(ManualClock::new(0)),
        )
    }

    #[tokio::test]
    async fn applies_snapshot_once_per_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skill_execution.json");
        std::fs::write(
            &path,
            r#"{"executions":{"exec-1":{"skillName":"lint","status":"running","currentStepIndex":1,"totalSteps":2}}}"#,
        )
        .unwrap();

        let state = state();
        let mut last = None;
        assert!(poll_once(&state, &path, &mut last).await);
        assert!(!poll_once(&state, &path, &mut last).await);

        let r = state.reconciler.lock().await;
        let list = r.running_list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].execution_id, "exec-1");
        assert_eq!(list[0].source_origin, SourceOrigin::FileWatcher);
    }

    #[tokio::test]
    async fn missing_or_broken_file_is_no_update() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skill_execution.json");
        let state = state();
        let mut last = None;
        assert!(!poll_once(&state, &path, &mut last).await);

        std::fs::write(&path, "{ truncated").unwrap();
        assert!(!poll_once(&state, &path, &mut last).await);
        assert!(state.reconciler.lock().await.running_list().is_empty());
    }
}
