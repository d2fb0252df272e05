//! Authoritative table of known executions.
//!
//! Every adapter goes through [`RunRegistry::add_or_update`], which enforces
//! the authority rule: a lower-priority source may refresh an entry's fields
//! but never takes ownership of it.

use crate::dedup;
use crate::types::{ExecutionStatus, RunningExecution, SourceOrigin};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

/// Partial execution report from one adapter. Absent fields leave the
/// existing entry untouched, or take neutral defaults on insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionUpdate {
    pub execution_id: String,
    pub job_name: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub progress_percent: Option<u8>,
    pub current_step_label: Option<String>,
    pub current_step_index: Option<usize>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_millis: Option<u64>,
    pub total_steps: Option<usize>,
}

impl ExecutionUpdate {
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// A new entry was created.
    Inserted { execution_id: String },
    /// An existing entry was refreshed. `previous_id` is set when the entry
    /// changed identifier under a takeover.
    Updated {
        execution_id: String,
        previous_id: Option<String>,
        became_terminal: bool,
    },
    /// Insertion was skipped by the anti-duplicate window.
    Suppressed { job_name: String },
    /// Unknown id with no job name to insert under.
    Ignored,
}

/// Result of a mutation plus whatever the deduplicator collapsed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub result: ApplyResult,
    pub deduplicated: Vec<dedup::Collapsed>,
}

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub dedup_window_ms: i64,
    pub terminal_grace_ms: i64,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            dedup_window_ms: 2_000,
            terminal_grace_ms: 5_000,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunRegistry {
    entries: Vec<RunningExecution>,
    options: RegistryOptions,
}

impl RunRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            entries: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn entries(&self) -> &[RunningExecution] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<RunningExecution> {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, execution_id: &str) -> Option<&RunningExecution> {
        self.entries.iter().find(|e| e.execution_id == execution_id)
    }

    pub fn running_for_job(&self, job_name: &str) -> Option<&RunningExecution> {
        self.entries
            .iter()
            .find(|e| e.job_name == job_name && e.is_running())
    }

    /// Entry an update refers to: same id, or else the running entry of the
    /// same job when the update itself reports a running execution. A
    /// terminal or pending report under another id describes a different run.
    fn position(&self, update: &ExecutionUpdate) -> Option<usize> {
        if let Some(i) = self
            .entries
            .iter()
            .position(|e| e.execution_id == update.execution_id)
        {
            return Some(i);
        }
        let job = update.job_name.as_deref()?;
        if !matches!(update.status, None | Some(ExecutionStatus::Running)) {
            return None;
        }
        self.entries
            .iter()
            .position(|e| e.job_name == job && e.is_running())
    }

    /// Merge `update` into the entry it refers to, or insert it.
    pub fn add_or_update(
        &mut self,
        origin: SourceOrigin,
        update: ExecutionUpdate,
        now_millis: i64,
    ) -> Mutation {
        let result = match self.position(&update) {
            Some(i) => self.merge(i, origin, update, now_millis),
            None => self.insert(origin, update, now_millis),
        };
        let deduplicated = dedup::deduplicate(self);
        Mutation {
            result,
            deduplicated,
        }
    }

    fn merge(
        &mut self,
        i: usize,
        origin: SourceOrigin,
        update: ExecutionUpdate,
        now_millis: i64,
    ) -> ApplyResult {
        let entry = &mut self.entries[i];
        let outranks = origin.priority() >= entry.source_origin.priority();
        let was_terminal = entry.status.is_terminal();

        if let Some(status) = update.status {
            // A lagging lower-authority report must not revive a finished run.
            let regresses = was_terminal && !status.is_terminal() && !outranks;
            if !regresses {
                entry.status = status;
            }
        }
        if let Some(p) = update.progress_percent {
            entry.progress_percent = p.min(100);
        }
        if let Some(label) = update.current_step_label {
            entry.current_step_label = label;
        }
        if update.current_step_index.is_some() {
            entry.current_step_index = update.current_step_index;
        }
        if let Some(elapsed) = update.elapsed_millis {
            entry.elapsed_millis = elapsed;
        }
        if let Some(total) = update.total_steps {
            if total > 0 || entry.total_steps == 0 {
                entry.total_steps = total;
            }
        }

        let mut previous_id = None;
        if outranks {
            if entry.execution_id != update.execution_id {
                debug!(
                    from = %entry.execution_id,
                    to = %update.execution_id,
                    origin = %origin,
                    "registry: execution id taken over"
                );
                previous_id = Some(std::mem::replace(
                    &mut entry.execution_id,
                    update.execution_id,
                ));
            }
            entry.source_origin = origin;
        }

        let is_terminal = entry.status.is_terminal();
        let became_terminal = is_terminal && !was_terminal;
        if became_terminal {
            entry.terminal_at_millis = Some(now_millis);
            if entry.status == ExecutionStatus::Completed {
                entry.progress_percent = 100;
            }
        } else if !is_terminal {
            entry.terminal_at_millis = None;
        }

        ApplyResult::Updated {
            execution_id: entry.execution_id.clone(),
            previous_id,
            became_terminal,
        }
    }

    fn insert(
        &mut self,
        origin: SourceOrigin,
        update: ExecutionUpdate,
        now_millis: i64,
    ) -> ApplyResult {
        let Some(job_name) = update.job_name else {
            debug!(execution_id = %update.execution_id, "registry: update for unknown execution ignored");
            return ApplyResult::Ignored;
        };

        // Running reports for a job with a running entry were merged above,
        // so the window only has to catch lagging lower-authority echoes.
        let window = self.options.dedup_window_ms;
        let recent = self.entries.iter().find(|e| {
            e.job_name == job_name
                && now_millis - e.added_at_millis < window
                && origin.priority() < e.source_origin.priority()
        });
        if let Some(existing) = recent {
            debug!(
                job_name = %job_name,
                existing = %existing.execution_id,
                origin = %origin,
                "registry: insertion suppressed inside anti-duplicate window"
            );
            return ApplyResult::Suppressed { job_name };
        }

        let status = update.status.unwrap_or(ExecutionStatus::Running);
        let started_at = update.started_at.unwrap_or_else(|| {
            chrono::TimeZone::timestamp_millis_opt(&Utc, now_millis)
                .single()
                .unwrap_or_else(Utc::now)
        });
        let progress_percent = if status == ExecutionStatus::Completed {
            100
        } else {
            update.progress_percent.unwrap_or(0).min(100)
        };
        let execution_id = update.execution_id;
        self.entries.push(RunningExecution {
            execution_id: execution_id.clone(),
            job_name,
            status,
            progress_percent,
            current_step_label: update.current_step_label.unwrap_or_default(),
            current_step_index: update.current_step_index,
            started_at,
            elapsed_millis: update.elapsed_millis.unwrap_or(0),
            source_origin: origin,
            total_steps: update.total_steps.unwrap_or(0),
            added_at_millis: now_millis,
            terminal_at_millis: status.is_terminal().then_some(now_millis),
        });
        ApplyResult::Inserted { execution_id }
    }

    /// Remove `execution_id` if it still exists and is terminal. With
    /// `terminal_at_millis` set, only the terminal transition stamped at that
    /// time qualifies, so a timer from an earlier finish of a revived run does
    /// nothing. Safe to call after the entry is already gone.
    pub fn remove_terminal(
        &mut self,
        execution_id: &str,
        terminal_at_millis: Option<i64>,
    ) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| {
            let due = e.execution_id == execution_id
                && e.status.is_terminal()
                && terminal_at_millis.map_or(true, |at| e.terminal_at_millis == Some(at));
            !due
        });
        before != self.entries.len()
    }

    /// Remove `execution_id` unconditionally.
    pub fn remove(&mut self, execution_id: &str) -> Option<RunningExecution> {
        let i = self
            .entries
            .iter()
            .position(|e| e.execution_id == execution_id)?;
        Some(self.entries.remove(i))
    }

    /// Remove every terminal entry whose grace window has elapsed.
    pub fn sweep_terminal(&mut self, now_millis: i64) -> Vec<String> {
        let grace = self.options.terminal_grace_ms;
        let mut removed = Vec::new();
        self.entries.retain(|e| match e.terminal_at_millis {
            Some(at) if e.status.is_terminal() && now_millis - at >= grace => {
                removed.push(e.execution_id.clone());
                false
            }
            _ => true,
        });
        removed
    }

    /// Apply a complete list from `origin`, then drop the entries `origin`
    /// owns that the list no longer mentions.
    pub fn reconcile_snapshot(
        &mut self,
        origin: SourceOrigin,
        items: Vec<ExecutionUpdate>,
        now_millis: i64,
    ) -> SnapshotResult {
        let mut touched: HashSet<String> = HashSet::new();
        let mut mutations = Vec::with_capacity(items.len());
        for item in items {
            touched.insert(item.execution_id.clone());
            let mutation = self.add_or_update(origin, item, now_millis);
            match &mutation.result {
                ApplyResult::Inserted { execution_id }
                | ApplyResult::Updated { execution_id, .. } => {
                    touched.insert(execution_id.clone());
                }
                _ => {}
            }
            mutations.push(mutation);
        }

        let grace = self.options.terminal_grace_ms;
        let mut removed = Vec::new();
        self.entries.retain(|e| {
            if e.source_origin != origin || touched.contains(&e.execution_id) {
                return true;
            }
            let in_grace = e.status.is_terminal()
                && e.terminal_at_millis
                    .is_some_and(|at| now_millis - at < grace);
            if !in_grace {
                removed.push(e.execution_id.clone());
            }
            in_grace
        });
        if !removed.is_empty() {
            debug!(origin = %origin, removed = ?removed, "registry: snapshot dropped vanished entries");
        }

        SnapshotResult { mutations, removed }
    }

    /// Remove `Running` entries older than `threshold_millis`.
    pub fn clear_stale_running(&mut self, threshold_millis: u64, now_millis: i64) -> Vec<String> {
        let mut removed = Vec::new();
        self.entries.retain(|e| {
            if !e.is_running() {
                return true;
            }
            let since_start = (now_millis - e.started_at.timestamp_millis()).max(0) as u64;
            let elapsed = e.elapsed_millis.max(since_start);
            if elapsed > threshold_millis {
                removed.push(e.execution_id.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotResult {
    pub mutations: Vec<Mutation>,
    pub removed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str, job: &str) -> ExecutionUpdate {
        ExecutionUpdate {
            job_name: Some(job.to_string()),
            status: Some(ExecutionStatus::Running),
            total_steps: Some(5),
            ..ExecutionUpdate::new(id)
        }
    }

    #[test]
    fn insert_then_update_by_id() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "deploy"), 0);

        let progress = ExecutionUpdate {
            progress_percent: Some(40),
            current_step_label: Some("build".to_string()),
            ..ExecutionUpdate::new("ws-1")
        };
        let m = reg.add_or_update(SourceOrigin::WebSocket, progress, 100);
        assert!(matches!(m.result, ApplyResult::Updated { .. }));
        let e = reg.get("ws-1").unwrap();
        assert_eq!(e.progress_percent, 40);
        assert_eq!(e.current_step_label, "build");
        assert_eq!(e.total_steps, 5);
    }

    #[test]
    fn lower_authority_never_takes_ownership() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "deploy"), 0);

        let poll = ExecutionUpdate {
            progress_percent: Some(20),
            ..started("poll-1", "deploy")
        };
        reg.add_or_update(SourceOrigin::PollingRpc, poll, 5_000);
        assert_eq!(reg.len(), 1);
        let e = &reg.entries()[0];
        assert_eq!(e.execution_id, "ws-1");
        assert_eq!(e.source_origin, SourceOrigin::WebSocket);
        assert_eq!(e.progress_percent, 20);

        let file = ExecutionUpdate::new("ws-1");
        reg.add_or_update(SourceOrigin::FileWatcher, file, 6_000);
        assert_eq!(reg.entries()[0].source_origin, SourceOrigin::WebSocket);
    }

    #[test]
    fn higher_authority_takes_over_id() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::FileWatcher, started("file-1", "deploy"), 0);
        let m = reg.add_or_update(SourceOrigin::WebSocket, started("ws-9", "deploy"), 3_000);
        assert_eq!(
            m.result,
            ApplyResult::Updated {
                execution_id: "ws-9".to_string(),
                previous_id: Some("file-1".to_string()),
                became_terminal: false,
            }
        );
        assert_eq!(reg.entries()[0].source_origin, SourceOrigin::WebSocket);
    }

    #[test]
    fn unknown_id_without_job_is_ignored() {
        let mut reg = RunRegistry::default();
        let m = reg.add_or_update(SourceOrigin::WebSocket, ExecutionUpdate::new("x"), 0);
        assert_eq!(m.result, ApplyResult::Ignored);
        assert!(reg.is_empty());
    }

    #[test]
    fn lagging_poll_is_suppressed_after_fast_completion() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "lint"), 0);
        let done = ExecutionUpdate {
            status: Some(ExecutionStatus::Completed),
            ..ExecutionUpdate::new("ws-1")
        };
        reg.add_or_update(SourceOrigin::WebSocket, done, 500);

        let m = reg.add_or_update(SourceOrigin::PollingRpc, started("poll-7", "lint"), 900);
        assert_eq!(
            m.result,
            ApplyResult::Suppressed {
                job_name: "lint".to_string()
            }
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn same_authority_rerun_is_not_suppressed() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "lint"), 0);
        let done = ExecutionUpdate {
            status: Some(ExecutionStatus::Completed),
            ..ExecutionUpdate::new("ws-1")
        };
        reg.add_or_update(SourceOrigin::WebSocket, done, 300);
        let m = reg.add_or_update(SourceOrigin::WebSocket, started("ws-2", "lint"), 600);
        assert!(matches!(m.result, ApplyResult::Inserted { .. }));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn lower_authority_cannot_revive_terminal_entry() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "lint"), 0);
        let failed = ExecutionUpdate {
            status: Some(ExecutionStatus::Failed),
            ..ExecutionUpdate::new("ws-1")
        };
        reg.add_or_update(SourceOrigin::WebSocket, failed, 100);
        let stale = ExecutionUpdate {
            status: Some(ExecutionStatus::Running),
            ..ExecutionUpdate::new("ws-1")
        };
        reg.add_or_update(SourceOrigin::FileWatcher, stale, 200);
        assert_eq!(reg.get("ws-1").unwrap().status, ExecutionStatus::Failed);
    }

    #[test]
    fn remove_terminal_is_noop_for_running_or_missing() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "lint"), 0);
        assert!(!reg.remove_terminal("ws-1", None));
        assert!(!reg.remove_terminal("nope", None));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn stale_removal_timer_spares_revived_run() {
        let mut reg = RunRegistry::default();
        let finished = |id: &str| ExecutionUpdate {
            status: Some(ExecutionStatus::Completed),
            ..ExecutionUpdate::new(id)
        };
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "lint"), 0);
        reg.add_or_update(SourceOrigin::WebSocket, finished("ws-1"), 1_000);
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "lint"), 2_000);
        reg.add_or_update(SourceOrigin::WebSocket, finished("ws-1"), 5_000);
        assert_eq!(reg.get("ws-1").unwrap().terminal_at_millis, Some(5_000));

        assert!(!reg.remove_terminal("ws-1", Some(1_000)));
        assert_eq!(reg.len(), 1);
        assert!(reg.remove_terminal("ws-1", Some(5_000)));
        assert!(reg.is_empty());
    }

    #[test]
    fn finished_record_of_another_run_leaves_live_entry_alone() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "deploy"), 0);

        let old_run = ExecutionUpdate {
            job_name: Some("deploy".to_string()),
            status: Some(ExecutionStatus::Completed),
            ..ExecutionUpdate::new("old-run")
        };
        let m = reg.add_or_update(SourceOrigin::FileWatcher, old_run, 3_000);
        assert!(matches!(
            m.result,
            ApplyResult::Inserted { ref execution_id } if execution_id == "old-run"
        ));

        let live = reg.get("ws-1").unwrap();
        assert_eq!(live.status, ExecutionStatus::Running);
        assert_eq!(live.source_origin, SourceOrigin::WebSocket);
        assert_eq!(live.terminal_at_millis, None);

        let queued = ExecutionUpdate {
            job_name: Some("deploy".to_string()),
            status: Some(ExecutionStatus::Pending),
            ..ExecutionUpdate::new("ws-2")
        };
        reg.add_or_update(SourceOrigin::WebSocket, queued, 4_000);
        assert_eq!(reg.get("ws-1").unwrap().status, ExecutionStatus::Running);
        assert_eq!(reg.get("ws-2").unwrap().status, ExecutionStatus::Pending);
    }

    #[test]
    fn lagging_terminal_echo_inside_window_is_suppressed() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "deploy"), 0);
        let echo = ExecutionUpdate {
            job_name: Some("deploy".to_string()),
            status: Some(ExecutionStatus::Failed),
            ..ExecutionUpdate::new("poll-1")
        };
        let m = reg.add_or_update(SourceOrigin::PollingRpc, echo, 1_000);
        assert!(matches!(m.result, ApplyResult::Suppressed { .. }));
        assert_eq!(reg.get("ws-1").unwrap().status, ExecutionStatus::Running);
    }

    #[test]
    fn sweep_respects_grace_window() {
        let mut reg = RunRegistry::default();
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "lint"), 0);
        let done = ExecutionUpdate {
            status: Some(ExecutionStatus::Completed),
            ..ExecutionUpdate::new("ws-1")
        };
        reg.add_or_update(SourceOrigin::WebSocket, done, 1_000);
        assert!(reg.sweep_terminal(5_000).is_empty());
        assert_eq!(reg.sweep_terminal(6_000), vec!["ws-1".to_string()]);
    }

    #[test]
    fn snapshot_drops_vanished_entries_it_owns() {
        let mut reg = RunRegistry::default();
        reg.reconcile_snapshot(
            SourceOrigin::FileWatcher,
            vec![started("f-1", "a"), started("f-2", "b")],
            0,
        );
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "c"), 0);

        let result = reg.reconcile_snapshot(SourceOrigin::FileWatcher, vec![started("f-1", "a")], 800);
        assert_eq!(result.removed, vec!["f-2".to_string()]);
        assert!(reg.get("f-1").is_some());
        assert!(reg.get("ws-1").is_some());
    }

    #[test]
    fn snapshot_keeps_terminal_entries_inside_grace() {
        let mut reg = RunRegistry::default();
        reg.reconcile_snapshot(SourceOrigin::FileWatcher, vec![started("f-1", "a")], 0);
        let done = ExecutionUpdate {
            status: Some(ExecutionStatus::Completed),
            ..ExecutionUpdate::new("f-1")
        };
        reg.reconcile_snapshot(SourceOrigin::FileWatcher, vec![done], 1_000);
        let result = reg.reconcile_snapshot(SourceOrigin::FileWatcher, vec![], 2_000);
        assert!(result.removed.is_empty());
        let result = reg.reconcile_snapshot(SourceOrigin::FileWatcher, vec![], 7_000);
        assert_eq!(result.removed, vec!["f-1".to_string()]);
    }

    #[test]
    fn stale_running_entries_are_cleared() {
        let mut reg = RunRegistry::default();
        let old = ExecutionUpdate {
            elapsed_millis: Some(31 * 60 * 1_000),
            ..started("f-1", "a")
        };
        reg.add_or_update(SourceOrigin::FileWatcher, old, 0);
        reg.add_or_update(SourceOrigin::WebSocket, started("ws-1", "b"), 0);
        let removed = reg.clear_stale_running(30 * 60 * 1_000, 1_000);
        assert_eq!(removed, vec!["f-1".to_string()]);
        assert_eq!(reg.len(), 1);
    }
}
