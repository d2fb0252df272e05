//! The live execution reconciler.
//!
//! One instance per view. Adapters call the `on_*` methods, the view issues
//! user commands, and every mutating call returns an [`Outcome`] telling the
//! caller how to redraw and which terminal entries to schedule for removal.
//!
//! ```text
//! adapter event ─▶ RunRegistry::add_or_update ─▶ dedup ─▶ StepTracker ─▶ RenderScheduler
//!                                                                           │
//!                                                              Outcome { redraw, removals }
//! ```

use crate::clock::Clock;
use crate::config::ReconcilerConfig;
use crate::error::{CenterError, Result};
use crate::registry::{ApplyResult, ExecutionUpdate, Mutation, RunRegistry};
use crate::render::RenderScheduler;
use crate::skill::SkillCatalog;
use crate::snapshot::SnapshotItem;
use crate::steps::StepTracker;
use crate::types::{
    progress_percent, ExecutionStatus, RedrawKind, RunningExecution, SourceOrigin, StepState,
    StepStatus, ViewMode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// A terminal entry the caller should remove after `delay_millis` by calling
/// [`Reconciler::remove_terminal`] with `terminal_at_millis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledRemoval {
    pub execution_id: String,
    pub delay_millis: u64,
    /// Terminal transition this removal belongs to.
    pub terminal_at_millis: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub redraw: RedrawKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removals: Vec<ScheduledRemoval>,
}

pub struct Reconciler {
    registry: RunRegistry,
    steps: StepTracker,
    render: RenderScheduler,
    catalog: SkillCatalog,
    clock: Arc<dyn Clock>,
    /// Job whose detail the user has open; drives watch auto-acquisition.
    viewed_job: Option<String>,
    stale_after_millis: u64,
    grace_millis: u64,
}

impl Reconciler {
    pub fn new(config: &ReconcilerConfig, catalog: SkillCatalog, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: RunRegistry::new(config.registry_options()),
            steps: StepTracker::default(),
            render: RenderScheduler::default(),
            catalog,
            clock,
            viewed_job: None,
            stale_after_millis: config.stale_after_millis(),
            grace_millis: config.terminal_grace_ms,
        }
    }

    // -----------------------------------------------------------------------
    // Inbound: adapter events
    // -----------------------------------------------------------------------

    pub fn on_started(
        &mut self,
        job_name: &str,
        execution_id: &str,
        started_at: Option<DateTime<Utc>>,
        total_steps: usize,
        source: SourceOrigin,
    ) -> Outcome {
        info!(job_name, execution_id, source = %source, "execution started");
        let update = ExecutionUpdate {
            job_name: Some(job_name.to_string()),
            status: Some(ExecutionStatus::Running),
            progress_percent: Some(0),
            current_step_index: Some(0),
            started_at,
            total_steps: Some(total_steps),
            ..ExecutionUpdate::new(execution_id)
        };
        let now = self.clock.now_millis();
        let mutation = self.registry.add_or_update(source, update, now);
        self.after_mutation(&mutation);
        self.finish(vec![mutation], false, false)
    }

    pub fn on_progress(
        &mut self,
        execution_id: &str,
        current_step_index: usize,
        total_steps: usize,
        current_step_label: Option<String>,
    ) -> Outcome {
        let now = self.clock.now_millis();
        let total = if total_steps > 0 {
            total_steps
        } else {
            self.registry
                .get(execution_id)
                .map(|e| e.total_steps)
                .unwrap_or(0)
        };
        let elapsed = self
            .registry
            .get(execution_id)
            .map(|e| (now - e.started_at.timestamp_millis()).max(0) as u64);
        let update = ExecutionUpdate {
            progress_percent: (total > 0).then(|| progress_percent(current_step_index, total)),
            current_step_label: Some(current_step_label.unwrap_or_default()),
            current_step_index: Some(current_step_index),
            total_steps: (total_steps > 0).then_some(total_steps),
            elapsed_millis: elapsed,
            ..ExecutionUpdate::new(execution_id)
        };
        let mutation = self
            .registry
            .add_or_update(SourceOrigin::WebSocket, update, now);
        self.after_mutation(&mutation);
        let step_changed = self.steps.note_progress(execution_id, current_step_index);
        self.finish(vec![mutation], step_changed, false)
    }

    pub fn on_step_update(
        &mut self,
        execution_id: &str,
        step_index: usize,
        status: StepState,
        duration_millis: Option<u64>,
        error_message: Option<String>,
    ) -> Outcome {
        let changed = self.steps.apply_step_event(
            execution_id,
            step_index,
            status,
            duration_millis,
            error_message,
        );
        if changed {
            debug!(execution_id, step_index, status = %status, "step updated");
        }
        self.finish(Vec::new(), changed, false)
    }

    pub fn on_completed(&mut self, execution_id: &str, success: bool) -> Outcome {
        info!(execution_id, success, "execution finished");
        let status = if success {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        let update = ExecutionUpdate {
            status: Some(status),
            ..ExecutionUpdate::new(execution_id)
        };
        let now = self.clock.now_millis();
        let mutation = self
            .registry
            .add_or_update(SourceOrigin::WebSocket, update, now);
        self.after_mutation(&mutation);
        let settled = self.steps.settle(execution_id, success);
        self.finish(vec![mutation], settled, false)
    }

    /// Complete list from a poll-based source.
    pub fn on_snapshot(&mut self, origin: SourceOrigin, items: Vec<SnapshotItem>) -> Outcome {
        let now = self.clock.now_millis();
        let updates: Vec<ExecutionUpdate> =
            items.into_iter().map(|i| i.into_update(origin)).collect();
        let progress: Vec<(String, usize)> = updates
            .iter()
            .filter_map(|u| u.current_step_index.map(|i| (u.execution_id.clone(), i)))
            .collect();

        let result = self.registry.reconcile_snapshot(origin, updates, now);
        for mutation in &result.mutations {
            self.after_mutation(mutation);
        }
        if !result.removed.is_empty() {
            info!(origin = %origin, removed = ?result.removed, "snapshot removed vanished executions");
        }
        let mut step_changed = false;
        for (id, idx) in progress {
            step_changed |= self.steps.note_progress(&id, idx);
        }
        self.finish(result.mutations, step_changed, false)
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Fire a scheduled removal. No-op if the entry is gone, no longer
    /// terminal, or finished again after `terminal_at_millis`.
    pub fn remove_terminal(
        &mut self,
        execution_id: &str,
        terminal_at_millis: Option<i64>,
    ) -> Outcome {
        if self.registry.remove_terminal(execution_id, terminal_at_millis) {
            debug!(execution_id, "terminal execution removed");
        }
        self.finish(Vec::new(), false, false)
    }

    /// Remove every terminal entry whose grace window has elapsed.
    pub fn tick(&mut self) -> Outcome {
        let removed = self.registry.sweep_terminal(self.clock.now_millis());
        if !removed.is_empty() {
            debug!(removed = ?removed, "sweep removed terminal executions");
        }
        self.finish(Vec::new(), false, false)
    }

    // -----------------------------------------------------------------------
    // User commands
    // -----------------------------------------------------------------------

    pub fn select_watch(&mut self, execution_id: &str) -> Result<Outcome> {
        let execution = self
            .registry
            .get(execution_id)
            .ok_or_else(|| CenterError::ExecutionNotFound(execution_id.to_string()))?;
        let definition = self.catalog.get(&execution.job_name);
        let changed = self.steps.set_watch(execution, definition);
        if changed {
            self.viewed_job = Some(execution.job_name.clone());
        }
        Ok(self.finish(Vec::new(), false, changed))
    }

    pub fn clear_watch(&mut self) -> Outcome {
        let changed = self.steps.clear_watch();
        self.viewed_job = None;
        self.finish(Vec::new(), false, changed)
    }

    /// Open a job's detail: watch its running execution if there is one,
    /// otherwise drop the watch.
    pub fn view_job(&mut self, job_name: &str) -> Outcome {
        let mut changed = self.viewed_job.as_deref() != Some(job_name);
        self.viewed_job = Some(job_name.to_string());
        match self.registry.running_for_job(job_name) {
            Some(execution) => {
                let definition = self.catalog.get(job_name);
                changed |= self.steps.set_watch(execution, definition);
            }
            None => {
                changed |= self.steps.clear_watch();
            }
        }
        self.finish(Vec::new(), false, changed)
    }

    pub fn clear_stale_running(&mut self) -> Outcome {
        let removed = self
            .registry
            .clear_stale_running(self.stale_after_millis, self.clock.now_millis());
        if !removed.is_empty() {
            info!(removed = ?removed, "cleared stale running executions");
        }
        self.finish(Vec::new(), false, !removed.is_empty())
    }

    /// Drop an execution now, whatever its status. A pending removal timer
    /// for it becomes a no-op.
    pub fn clear_execution(&mut self, execution_id: &str) -> Outcome {
        let removed = self.registry.remove(execution_id).is_some();
        if removed {
            info!(execution_id, "execution cleared");
        }
        self.finish(Vec::new(), false, removed)
    }

    pub fn set_view(&mut self, view: ViewMode) -> Outcome {
        if let ViewMode::Detail { execution_id } = &view {
            if let Some(execution) = self.registry.get(execution_id) {
                let definition = self.catalog.get(&execution.job_name);
                if self.steps.set_watch(execution, definition) {
                    self.viewed_job = Some(execution.job_name.clone());
                }
            }
        }
        let kind = self.render.set_view(view);
        let mut outcome = self.finish(Vec::new(), false, false);
        outcome.redraw = outcome.redraw.max(kind);
        outcome
    }

    /// User-requested refresh; bypasses every suppression.
    pub fn force_redraw(&mut self) -> Outcome {
        self.finish(Vec::new(), false, true)
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Snapshot for a full redraw. Running entries report elapsed time up to now.
    pub fn running_list(&self) -> Vec<RunningExecution> {
        let now = self.clock.now_millis();
        self.registry
            .entries()
            .iter()
            .map(|e| {
                let mut e = e.clone();
                if e.is_running() {
                    let since = (now - e.started_at.timestamp_millis()).max(0) as u64;
                    e.elapsed_millis = e.elapsed_millis.max(since);
                }
                e
            })
            .collect()
    }

    pub fn step_statuses(&self, execution_id: &str) -> Option<&[StepStatus]> {
        self.steps.statuses(execution_id)
    }

    pub fn get(&self, execution_id: &str) -> Option<&RunningExecution> {
        self.registry.get(execution_id)
    }

    pub fn watched(&self) -> Option<&str> {
        self.steps.watched()
    }

    pub fn view(&self) -> &ViewMode {
        self.render.view()
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Keep the watch attached to the same logical execution and pick it up
    /// for the job the user is viewing.
    fn after_mutation(&mut self, mutation: &Mutation) {
        if let ApplyResult::Updated {
            execution_id,
            previous_id: Some(prev),
            ..
        } = &mutation.result
        {
            self.steps.rename_watch(prev, execution_id);
        }
        for c in &mutation.deduplicated {
            self.steps.rename_watch(&c.removed_id, &c.survivor_id);
        }

        let touched = match &mutation.result {
            ApplyResult::Inserted { execution_id } | ApplyResult::Updated { execution_id, .. } => {
                execution_id
            }
            _ => return,
        };
        if self.steps.watched().is_some() {
            return;
        }
        let Some(viewed) = self.viewed_job.as_deref() else {
            return;
        };
        if let Some(execution) = self.registry.get(touched) {
            if execution.job_name == viewed && execution.is_running() {
                debug!(execution_id = %execution.execution_id, "watch auto-acquired");
                let definition = self.catalog.get(&execution.job_name);
                self.steps.set_watch(execution, definition);
            }
        }
    }

    fn finish(&mut self, mutations: Vec<Mutation>, step_changed: bool, force: bool) -> Outcome {
        let orphaned = self
            .steps
            .watched()
            .is_some_and(|w| self.registry.get(w).is_none());
        if orphaned {
            debug!(execution_id = ?self.steps.watched(), "watched execution left the registry");
            self.steps.clear_watch();
        }

        let watched = self.steps.watched();
        let mut redraw = self.render.observe(self.registry.entries(), watched, force);
        if redraw == RedrawKind::None && step_changed {
            redraw = self.render.step_patch(watched);
        }

        let removals = mutations
            .iter()
            .filter_map(|m| match &m.result {
                ApplyResult::Updated {
                    execution_id,
                    became_terminal: true,
                    ..
                }
                | ApplyResult::Inserted { execution_id } => self.registry.get(execution_id),
                _ => None,
            })
            .filter(|e| e.status.is_terminal())
            .filter_map(|e| {
                e.terminal_at_millis.map(|at| ScheduledRemoval {
                    execution_id: e.execution_id.clone(),
                    delay_millis: self.grace_millis,
                    terminal_at_millis: at,
                })
            })
            .collect();

        Outcome { redraw, removals }
    }
}
