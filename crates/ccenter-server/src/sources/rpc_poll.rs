//! Lowest-authority fallback: ask the skill daemon bridge for the one
//! execution it considers current.

use anyhow::Context;
use ccenter_core::snapshot::{RpcResponse, SnapshotItem};
use ccenter_core::types::SourceOrigin;
use std::time::Duration;
use tracing::warn;

use crate::state::AppState;

#[derive(Clone)]
pub struct RpcPoller {
    client: reqwest::Client,
    url: String,
}

impl RpcPoller {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/skills/current", base_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One call. Transport errors and `success: false` are both errors.
    pub async fn fetch(&self) -> anyhow::Result<Option<SnapshotItem>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()?;
        let envelope: RpcResponse<SnapshotItem> = response
            .json()
            .await
            .context("decoding skill daemon response")?;
        Ok(envelope.into_result()?)
    }

    /// Fetch and apply. Failed calls never reach the registry.
    pub async fn poll_once(&self, state: &AppState) -> anyhow::Result<()> {
        let current = self.fetch().await?;
        let items: Vec<SnapshotItem> = current.into_iter().collect();
        state
            .mutate(|r| r.on_snapshot(SourceOrigin::PollingRpc, items))
            .await;
        Ok(())
    }
}

pub fn spawn(state: AppState, poller: RpcPoller, interval: Duration, max_backoff: Duration) {
    tokio::spawn(async move {
        let mut delay = interval;
        loop {
            tokio::time::sleep(delay).await;
            match poller.poll_once(&state).await {
                Ok(()) => delay = interval,
                Err(e) => {
                    delay = skill_stream::next_backoff(delay, max_backoff.max(interval));
                    warn!(
                        url = %poller.url(),
                        error = %format!("{e:#}"),
                        retry_in_ms = delay.as_millis() as u64,
                        "skill daemon poll failed"
                    );
                }
            }
        }
    });
}
