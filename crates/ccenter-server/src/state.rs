use ccenter_core::clock::{Clock, SystemClock};
use ccenter_core::config::Config;
use ccenter_core::skill::SkillCatalog;
use ccenter_core::types::RedrawKind;
use ccenter_core::{Outcome, Reconciler, ScheduledRemoval};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

/// Message broadcast to every SSE subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SseMessage {
    Redraw { kind: RedrawKind },
}

/// Shared application state passed to all route handlers and source adapters.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub reconciler: Arc<Mutex<Reconciler>>,
    pub event_tx: broadcast::Sender<SseMessage>,
}

impl AppState {
    pub fn new(root: PathBuf, config: Config, catalog: SkillCatalog) -> Self {
        Self::with_clock(root, config, catalog, Arc::new(SystemClock))
    }

    pub fn with_clock(
        root: PathBuf,
        config: Config,
        catalog: SkillCatalog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (tx, _) = broadcast::channel(64);
        let reconciler = Reconciler::new(&config.reconciler, catalog, clock);
        Self {
            root,
            config: Arc::new(config),
            reconciler: Arc::new(Mutex::new(reconciler)),
            event_tx: tx,
        }
    }

    /// Run one mutation under the lock, then publish its outcome.
    pub async fn mutate<F>(&self, f: F) -> Outcome
    where
        F: FnOnce(&mut Reconciler) -> Outcome,
    {
        let outcome = {
            let mut reconciler = self.reconciler.lock().await;
            f(&mut reconciler)
        };
        self.publish(&outcome);
        outcome
    }

    /// Like [`AppState::mutate`] for commands that can be rejected.
    pub async fn try_mutate<F>(&self, f: F) -> ccenter_core::Result<Outcome>
    where
        F: FnOnce(&mut Reconciler) -> ccenter_core::Result<Outcome>,
    {
        let outcome = {
            let mut reconciler = self.reconciler.lock().await;
            f(&mut reconciler)?
        };
        self.publish(&outcome);
        Ok(outcome)
    }

    /// Broadcast the redraw decision and start a timer for each removal.
    pub fn publish(&self, outcome: &Outcome) {
        if outcome.redraw != RedrawKind::None {
            // No subscribers is fine.
            let _ = self.event_tx.send(SseMessage::Redraw {
                kind: outcome.redraw,
            });
        }
        for removal in &outcome.removals {
            self.schedule_removal(removal.clone());
        }
    }

    fn schedule_removal(&self, removal: ScheduledRemoval) {
        // Skipped outside a Tokio runtime (sync unit tests).
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        let state = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(removal.delay_millis)).await;
            debug!(execution_id = %removal.execution_id, "removal timer fired");
            state
                .mutate(|r| {
                    r.remove_terminal(&removal.execution_id, Some(removal.terminal_at_millis))
                })
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccenter_core::clock::ManualClock;
    use ccenter_core::types::SourceOrigin;

    fn state() -> AppState {
        AppState::with_clock(
            PathBuf::from("/tmp/test"),
            Config::default(),
            SkillCatalog::default(),
            Arc::new(ManualClock::new(0)),
        )
    }

    #[tokio::test]
    async fn mutation_broadcasts_redraw() {
        let state = state();
        let mut rx = state.event_tx.subscribe();
        state
            .mutate(|r| r.on_started("deploy", "ws-1", None, 3, SourceOrigin::WebSocket))
            .await;
        assert_eq!(
            rx.recv().await.unwrap(),
            SseMessage::Redraw {
                kind: RedrawKind::Full
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn completed_execution_is_removed_by_timer() {
        let state = state();
        state
            .mutate(|r| r.on_started("deploy", "ws-1", None, 3, SourceOrigin::WebSocket))
            .await;
        let outcome = state.mutate(|r| r.on_completed("ws-1", true)).await;
        assert_eq!(outcome.removals.len(), 1);
        assert_eq!(state.reconciler.lock().await.running_list().len(), 1);

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert!(state.reconciler.lock().await.running_list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_from_an_earlier_finish_spares_a_rerun() {
        let clock = ManualClock::new(0);
        let state = AppState::with_clock(
            PathBuf::from("/tmp/test"),
            Config::default(),
            SkillCatalog::default(),
            Arc::new(clock.clone()),
        );
        state
            .mutate(|r| r.on_started("deploy", "ws-1", None, 3, SourceOrigin::WebSocket))
            .await;
        state.mutate(|r| r.on_completed("ws-1", false)).await;

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        clock.advance(3_000);
        state
            .mutate(|r| r.on_started("deploy", "ws-1", None, 3, SourceOrigin::WebSocket))
            .await;
        state.mutate(|r| r.on_completed("ws-1", true)).await;

        // First timer fires at 5s; the second finish is only 2s old.
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(state.reconciler.lock().await.running_list().len(), 1);

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert!(state.reconciler.lock().await.running_list().is_empty());
    }
}
