//! Serializable form of everything that can happen to a [`Reconciler`]:
//! adapter events, timer firings, user commands and clock movement. One
//! value per line makes a replayable session log.
//!
//! ```json
//! {"event":"started","job_name":"deploy","execution_id":"ws-1","total_steps":4}
//! {"event":"advance","millis":1500}
//! {"event":"completed","execution_id":"ws-1","success":true}
//! ```

use crate::clock::ManualClock;
use crate::config::ReconcilerConfig;
use crate::error::{CenterError, Result};
use crate::reconciler::{Outcome, Reconciler};
use crate::skill::SkillCatalog;
use crate::snapshot::SnapshotItem;
use crate::types::{SourceOrigin, StepState, ViewMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReconcilerInput {
    Started {
        job_name: String,
        execution_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
        #[serde(default)]
        total_steps: usize,
        #[serde(default = "default_source")]
        source: SourceOrigin,
    },
    Progress {
        execution_id: String,
        current_step_index: usize,
        #[serde(default)]
        total_steps: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_step_label: Option<String>,
    },
    StepUpdate {
        execution_id: String,
        step_index: usize,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_millis: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
    Completed {
        execution_id: String,
        success: bool,
    },
    Snapshot {
        origin: SourceOrigin,
        #[serde(default)]
        items: Vec<SnapshotItem>,
    },
    /// A scheduled removal timer firing. Without `terminal_at_millis` any
    /// terminal entry under the id is removed.
    RemoveTerminal {
        execution_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        terminal_at_millis: Option<i64>,
    },
    SelectWatch {
        execution_id: String,
    },
    ClearWatch,
    ViewJob {
        job_name: String,
    },
    ClearStaleRunning,
    ClearExecution {
        execution_id: String,
    },
    SetView {
        view: ViewMode,
    },
    Refresh,
    /// Move the clock forward, firing any removals that fall due.
    Advance {
        millis: i64,
    },
}

fn default_source() -> SourceOrigin {
    SourceOrigin::WebSocket
}

impl ReconcilerInput {
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcilerInput::Started { .. } => "started",
            ReconcilerInput::Progress { .. } => "progress",
            ReconcilerInput::StepUpdate { .. } => "step_update",
            ReconcilerInput::Completed { .. } => "completed",
            ReconcilerInput::Snapshot { .. } => "snapshot",
            ReconcilerInput::RemoveTerminal { .. } => "remove_terminal",
            ReconcilerInput::SelectWatch { .. } => "select_watch",
            ReconcilerInput::ClearWatch => "clear_watch",
            ReconcilerInput::ViewJob { .. } => "view_job",
            ReconcilerInput::ClearStaleRunning => "clear_stale_running",
            ReconcilerInput::ClearExecution { .. } => "clear_execution",
            ReconcilerInput::SetView { .. } => "set_view",
            ReconcilerInput::Refresh => "refresh",
            ReconcilerInput::Advance { .. } => "advance",
        }
    }
}

impl Reconciler {
    /// Apply one input. `Advance` only sweeps here; moving the clock is the
    /// caller's job (see [`Replay`]).
    pub fn dispatch(&mut self, input: ReconcilerInput) -> Result<Outcome> {
        let outcome = match input {
            ReconcilerInput::Started {
                job_name,
                execution_id,
                started_at,
                total_steps,
                source,
            } => self.on_started(&job_name, &execution_id, started_at, total_steps, source),
            ReconcilerInput::Progress {
                execution_id,
                current_step_index,
                total_steps,
                current_step_label,
            } => self.on_progress(
                &execution_id,
                current_step_index,
                total_steps,
                current_step_label,
            ),
            ReconcilerInput::StepUpdate {
                execution_id,
                step_index,
                status,
                duration_millis,
                error_message,
            } => {
                let status = StepState::from_event(&status)
                    .ok_or_else(|| CenterError::InvalidStatus(status.clone()))?;
                self.on_step_update(
                    &execution_id,
                    step_index,
                    status,
                    duration_millis,
                    error_message,
                )
            }
            ReconcilerInput::Completed {
                execution_id,
                success,
            } => self.on_completed(&execution_id, success),
            ReconcilerInput::Snapshot { origin, items } => self.on_snapshot(origin, items),
            ReconcilerInput::RemoveTerminal {
                execution_id,
                terminal_at_millis,
            } => self.remove_terminal(&execution_id, terminal_at_millis),
            ReconcilerInput::SelectWatch { execution_id } => self.select_watch(&execution_id)?,
            ReconcilerInput::ClearWatch => self.clear_watch(),
            ReconcilerInput::ViewJob { job_name } => self.view_job(&job_name),
            ReconcilerInput::ClearStaleRunning => self.clear_stale_running(),
            ReconcilerInput::ClearExecution { execution_id } => {
                self.clear_execution(&execution_id)
            }
            ReconcilerInput::SetView { view } => self.set_view(view),
            ReconcilerInput::Refresh => self.force_redraw(),
            ReconcilerInput::Advance { .. } => self.tick(),
        };
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// A reconciler on a manual clock, driven entirely by [`ReconcilerInput`]s.
pub struct Replay {
    reconciler: Reconciler,
    clock: ManualClock,
}

impl Replay {
    pub fn new(config: &ReconcilerConfig, catalog: SkillCatalog, start_millis: i64) -> Self {
        let clock = ManualClock::new(start_millis);
        let reconciler = Reconciler::new(config, catalog, Arc::new(clock.clone()));
        Self { reconciler, clock }
    }

    pub fn apply(&mut self, input: ReconcilerInput) -> Result<Outcome> {
        if let ReconcilerInput::Advance { millis } = &input {
            self.clock.advance(*millis);
        }
        self.reconciler.dispatch(input)
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }
}
