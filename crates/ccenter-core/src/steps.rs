use crate::skill::SkillDefinition;
use crate::types::{RunningExecution, StepState, StepStatus};
use tracing::warn;

/// Upper bound on the step array. Indices at or past it are rejected.
pub const MAX_STEPS: usize = 1_024;

/// Per-step state for the one execution being watched.
#[derive(Debug, Default)]
pub struct StepTracker {
    watched: Option<String>,
    steps: Vec<StepStatus>,
}

impl StepTracker {
    pub fn watched(&self) -> Option<&str> {
        self.watched.as_deref()
    }

    pub fn is_watching(&self, execution_id: &str) -> bool {
        self.watched.as_deref() == Some(execution_id)
    }

    /// Step array for `execution_id`, or `None` when it is not watched.
    pub fn statuses(&self, execution_id: &str) -> Option<&[StepStatus]> {
        if self.is_watching(execution_id) {
            Some(&self.steps)
        } else {
            None
        }
    }

    /// Switch the watch to `execution`. When it is running and its step count
    /// is known, estimate the array from progress until exact step events
    /// arrive. Re-watching the current target keeps the array.
    pub fn set_watch(
        &mut self,
        execution: &RunningExecution,
        definition: Option<&SkillDefinition>,
    ) -> bool {
        if self.is_watching(&execution.execution_id) {
            return false;
        }
        self.watched = Some(execution.execution_id.clone());
        self.steps.clear();

        let total = definition
            .map(|d| d.steps.len())
            .filter(|n| *n > 0)
            .unwrap_or(execution.total_steps)
            .min(MAX_STEPS);
        if total == 0 {
            return true;
        }

        let current = if execution.is_running() {
            execution
                .current_step_index
                .map(|i| i.min(total - 1))
                .or_else(|| execution.progress_step_index(total))
        } else {
            None
        };

        self.steps = (0..total)
            .map(|i| {
                let mut step = StepStatus::pending(i);
                step.name = definition.and_then(|d| d.steps.get(i)).map(|s| s.name.clone());
                step.status = match current {
                    Some(c) if i < c => StepState::Success,
                    Some(c) if i == c => StepState::Running,
                    _ => StepState::Pending,
                };
                step
            })
            .collect();
        true
    }

    /// Move the watch to a new identifier for the same logical execution,
    /// keeping the step array.
    pub fn rename_watch(&mut self, from: &str, to: &str) -> bool {
        if self.is_watching(from) {
            self.watched = Some(to.to_string());
            true
        } else {
            false
        }
    }

    /// Overwrite one step. Ignored unless `execution_id` is watched; grows the
    /// array with pending steps as needed. Returns whether anything changed.
    pub fn apply_step_event(
        &mut self,
        execution_id: &str,
        step_index: usize,
        status: StepState,
        duration_millis: Option<u64>,
        error_message: Option<String>,
    ) -> bool {
        if !self.is_watching(execution_id) || !in_range(execution_id, step_index) {
            return false;
        }
        self.grow_to(step_index + 1);
        let step = &mut self.steps[step_index];
        let before = step.clone();
        step.status = status;
        if duration_millis.is_some() {
            step.duration_millis = duration_millis;
        }
        if error_message.is_some() {
            step.error_message = error_message;
        }
        *step != before
    }

    /// Progress report for the watched execution: mark `step_index` running
    /// if nothing more exact has been recorded for it yet, and settle steps
    /// before it that were still running.
    pub fn note_progress(&mut self, execution_id: &str, step_index: usize) -> bool {
        if !self.is_watching(execution_id) || !in_range(execution_id, step_index) {
            return false;
        }
        self.grow_to(step_index + 1);
        let mut changed = false;
        for step in self.steps[..step_index]
            .iter_mut()
            .filter(|s| s.status == StepState::Running)
        {
            step.status = StepState::Success;
            changed = true;
        }
        let step = &mut self.steps[step_index];
        if step.status == StepState::Pending {
            step.status = StepState::Running;
            changed = true;
        }
        changed
    }

    /// Settle any still-running step once the execution finishes.
    pub fn settle(&mut self, execution_id: &str, success: bool) -> bool {
        if !self.is_watching(execution_id) {
            return false;
        }
        let mut changed = false;
        for step in self.steps.iter_mut().filter(|s| s.status == StepState::Running) {
            step.status = if success {
                StepState::Success
            } else {
                StepState::Failed
            };
            changed = true;
        }
        changed
    }

    pub fn clear_watch(&mut self) -> bool {
        let had = self.watched.take().is_some();
        self.steps.clear();
        had
    }

    fn grow_to(&mut self, len: usize) {
        while self.steps.len() < len {
            let i = self.steps.len();
            self.steps.push(StepStatus::pending(i));
        }
    }
}

fn in_range(execution_id: &str, step_index: usize) -> bool {
    if step_index < MAX_STEPS {
        return true;
    }
    warn!(execution_id, step_index, "step index out of range, ignored");
    false
}
