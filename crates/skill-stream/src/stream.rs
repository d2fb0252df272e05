use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info};
use url::Url;

use crate::error::SkillStreamError;
use crate::types::SkillMessage;
use crate::Result;

// ─── Options ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Delay before the first reconnect; also the value backoff resets to
    /// after a successful connect.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub channel_capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            channel_capacity: 64,
        }
    }
}

/// Double `current`, capped at `max`.
pub fn next_backoff(current: Duration, max: Duration) -> Duration {
    let next = current + current;
    if next > max {
        max
    } else {
        next
    }
}

/// Parse one text frame. Blank frames yield `None`.
pub fn parse_frame(text: &str) -> Option<Result<SkillMessage>> {
    let line = text.trim();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str(line).map_err(|source| SkillStreamError::Parse {
            line: line.to_string(),
            source,
        }),
    )
}

// ─── SkillEventStream ─────────────────────────────────────────────────────

/// An async stream of [`SkillMessage`]s from the skill execution WebSocket.
///
/// A background task owns the connection, reconnecting with exponential
/// backoff whenever it drops. Failed connects surface as
/// `Err(SkillStreamError::Connect)` items and unparseable frames as
/// `Err(SkillStreamError::Parse)`; the stream itself only ends when it is
/// dropped. Dropping it stops the background task.
///
/// ```rust,ignore
/// use futures::StreamExt;
/// use skill_stream::{SkillEventStream, SkillMessage, StreamOptions};
///
/// let mut stream = SkillEventStream::connect("ws://localhost:9876", StreamOptions::default())?;
/// while let Some(msg) = stream.next().await {
///     if let Ok(SkillMessage::SkillStarted(s)) = msg {
///         println!("{} started", s.skill_name);
///     }
/// }
/// ```
pub struct SkillEventStream {
    rx: mpsc::Receiver<Result<SkillMessage>>,
}

impl SkillEventStream {
    /// Validate `url` and spawn the connection task. Must be called inside a
    /// Tokio runtime.
    pub fn connect(url: &str, opts: StreamOptions) -> Result<Self> {
        let url = Url::parse(url).map_err(|_| SkillStreamError::InvalidUrl(url.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(SkillStreamError::InvalidUrl(url.to_string()));
        }

        let (tx, rx) = mpsc::channel(opts.channel_capacity.max(1));
        tokio::spawn(pump(url, opts, tx));
        Ok(SkillEventStream { rx })
    }

    /// Wrap a raw mpsc receiver as a `SkillEventStream`.
    #[cfg(test)]
    pub(crate) fn from_channel(rx: mpsc::Receiver<Result<SkillMessage>>) -> Self {
        Self { rx }
    }
}

impl Stream for SkillEventStream {
    type Item = Result<SkillMessage>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

async fn pump(url: Url, opts: StreamOptions, tx: mpsc::Sender<Result<SkillMessage>>) {
    let mut backoff = opts.initial_backoff;
    loop {
        let (mut ws, _) = match connect_async(url.as_str()).await {
            Ok(value) => value,
            Err(err) => {
                let failure = SkillStreamError::Connect(err.to_string());
                if tx.send(Err(failure)).await.is_err() {
                    return;
                }
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff, opts.max_backoff);
                continue;
            }
        };
        info!(url = %url, "skill stream connected");
        backoff = opts.initial_backoff;

        loop {
            tokio::select! {
                frame = ws.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Some(item) = parse_frame(&text) {
                            if tx.send(item).await.is_err() {
                                let _ = ws.close(None).await;
                                return;
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(url = %url, error = %err, "skill stream read error");
                        break;
                    }
                },
                _ = tx.closed() => {
                    let _ = ws.close(None).await;
                    return;
                }
            }
        }

        info!(url = %url, retry_in_ms = backoff.as_millis() as u64, "skill stream disconnected");
        tokio::time::sleep(backoff).await;
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
