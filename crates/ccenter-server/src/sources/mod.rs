//! Source adapters. Each runs as its own task and reaches the registry only
//! through [`AppState::mutate`].

pub mod file_watcher;
pub mod rpc_poll;
pub mod websocket;

use std::time::Duration;
use tracing::{info, warn};

use crate::state::AppState;

/// Start every adapter the config enables.
pub fn spawn_all(state: &AppState) -> anyhow::Result<()> {
    let sources = state.config.sources.clone();
    let max_backoff = Duration::from_secs(sources.max_backoff_secs.max(1));

    if let Some(url) = &sources.websocket_url {
        let opts = skill_stream::StreamOptions {
            max_backoff,
            ..Default::default()
        };
        websocket::spawn(state.clone(), url, opts)?;
        info!(url = %url, "websocket source started");
    }

    match sources.state_file_path() {
        Ok(path) => {
            info!(path = %path.display(), "state file source started");
            file_watcher::spawn(
                state.clone(),
                path,
                Duration::from_millis(sources.file_poll_ms),
            );
        }
        Err(e) => warn!(error = %e, "state file source disabled"),
    }

    if let Some(url) = &sources.rpc_url {
        let poller = rpc_poll::RpcPoller::new(url);
        info!(url = %poller.url(), "rpc poll source started");
        rpc_poll::spawn(
            state.clone(),
            poller,
            Duration::from_millis(sources.rpc_poll_ms),
            max_backoff,
        );
    }

    Ok(())
}
