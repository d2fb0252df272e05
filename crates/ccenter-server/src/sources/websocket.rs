//! Push-stream adapter: highest authority, exact step events.

use ccenter_core::types::{SourceOrigin, StepState};
use ccenter_core::{Outcome, Reconciler};
use futures::{Stream, StreamExt};
use skill_stream::{SkillMessage, SkillStreamError, StreamOptions};
use tracing::{debug, warn};

use crate::state::AppState;

/// Connect to `url` and feed every message into the reconciler.
pub fn spawn(state: AppState, url: &str, opts: StreamOptions) -> anyhow::Result<()> {
    let stream = skill_stream::connect(url, opts)?;
    tokio::spawn(run(state, stream));
    Ok(())
}

pub async fn run<S>(state: AppState, mut stream: S)
where
    S: Stream<Item = skill_stream::Result<SkillMessage>> + Unpin,
{
    while let Some(item) = stream.next().await {
        match item {
            Ok(SkillMessage::Heartbeat) | Ok(SkillMessage::Unknown) => {}
            Ok(msg) => {
                state.mutate(|r| apply_message(r, msg)).await;
            }
            Err(SkillStreamError::Connect(e)) => {
                debug!(error = %e, "skill stream unavailable, retrying");
            }
            Err(e) => warn!(error = %e, "skipping skill stream message"),
        }
    }
}

/// Translate one stream message into the matching reconciler call.
pub fn apply_message(r: &mut Reconciler, msg: SkillMessage) -> Outcome {
    match msg {
        SkillMessage::SkillStarted(m) => r.on_started(
            &m.skill_name,
            &m.execution_id,
            m.started_at,
            m.total_steps,
            SourceOrigin::WebSocket,
        ),
        SkillMessage::SkillProgress(m) => r.on_progress(
            &m.execution_id,
            m.current_step_index,
            m.total_steps,
            m.current_step_label,
        ),
        SkillMessage::StepUpdate(m) => match StepState::from_event(&m.status) {
            Some(status) => r.on_step_update(
                &m.execution_id,
                m.step_index,
                status,
                m.duration_millis,
                m.error_message,
            ),
            None => {
                warn!(execution_id = %m.execution_id, status = %m.status, "unknown step status");
                Outcome::default()
            }
        },
        SkillMessage::SkillCompleted(m) => r.on_completed(&m.execution_id, m.success),
        SkillMessage::Heartbeat | SkillMessage::Unknown => Outcome::default(),
    }
}
