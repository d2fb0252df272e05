use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::{AppState, SseMessage};

/// GET /api/events: SSE stream emitting a `redraw` event per non-`none`
/// redraw decision.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.event_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let SseMessage::Redraw { kind } = msg.ok()?;
        let data = serde_json::json!({ "kind": kind }).to_string();
        Some(Ok::<Event, Infallible>(
            Event::default().event("redraw").data(data),
        ))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
