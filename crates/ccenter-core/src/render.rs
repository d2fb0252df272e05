use crate::types::{RedrawKind, RunningExecution, ViewMode};

/// Two-level change detector over the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    /// Sorted `execution_id:status` entries.
    pub structural: String,
    /// Structural plus `progress_percent:current_step_label`.
    pub progress: String,
}

impl Fingerprint {
    pub fn of(entries: &[RunningExecution]) -> Self {
        let mut structural: Vec<String> = entries
            .iter()
            .map(|e| format!("{}:{:?}", e.execution_id, e.status))
            .collect();
        let mut progress: Vec<String> = entries
            .iter()
            .map(|e| {
                format!(
                    "{}:{:?}:{}:{}",
                    e.execution_id, e.status, e.progress_percent, e.current_step_label
                )
            })
            .collect();
        structural.sort();
        progress.sort();
        Self {
            structural: structural.join("|"),
            progress: progress.join("|"),
        }
    }
}

/// Redraw decision as a pure function of the fingerprint transition, what the
/// view is showing, and whether a user action forces the redraw.
pub fn decide(
    prev: &Fingerprint,
    next: &Fingerprint,
    view: &ViewMode,
    watched: Option<&str>,
    force: bool,
) -> RedrawKind {
    if matches!(view, ViewMode::Graph) && !force {
        return RedrawKind::None;
    }
    if force || prev.structural != next.structural {
        return RedrawKind::Full;
    }
    if prev.progress != next.progress {
        return if shows_watched_detail(view, watched) {
            RedrawKind::Incremental
        } else {
            RedrawKind::Full
        };
    }
    RedrawKind::None
}

/// True when the view is the step detail of the watched execution.
pub fn shows_watched_detail(view: &ViewMode, watched: Option<&str>) -> bool {
    match (view, watched) {
        (ViewMode::Detail { execution_id }, Some(w)) => execution_id == w,
        _ => false,
    }
}

/// Remembers the last fingerprint and the current view mode.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    last: Fingerprint,
    view: ViewMode,
}

impl RenderScheduler {
    pub fn view(&self) -> &ViewMode {
        &self.view
    }

    pub fn last(&self) -> &Fingerprint {
        &self.last
    }

    /// Compare `entries` against the last fingerprint and record it.
    pub fn observe(
        &mut self,
        entries: &[RunningExecution],
        watched: Option<&str>,
        force: bool,
    ) -> RedrawKind {
        let next = Fingerprint::of(entries);
        let kind = decide(&self.last, &next, &self.view, watched, force);
        self.last = next;
        kind
    }

    /// Switch the view. Returns `Full` unless the view is unchanged.
    pub fn set_view(&mut self, view: ViewMode) -> RedrawKind {
        if self.view == view {
            return RedrawKind::None;
        }
        self.view = view;
        RedrawKind::Full
    }

    /// Redraw for a step array change that left the fingerprints alone.
    pub fn step_patch(&self, watched: Option<&str>) -> RedrawKind {
        if shows_watched_detail(&self.view, watched) {
            RedrawKind::Incremental
        } else {
            RedrawKind::None
        }
    }
}
