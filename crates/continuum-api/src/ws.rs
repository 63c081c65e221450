//! `WebSocket` handler for live turn events.
//!
//! Clients connect to `GET /ws/events` and receive each [`LiveEvent`] as a
//! JSON text frame. The handler uses a [`broadcast::Receiver`] so all
//! connected clients see the same stream.
//!
//! If a client falls behind, lagged events are skipped and the client
//! resumes from the most recent one. Clients that need the full picture
//! after a lag can poll `GET /api/status`.
//!
//! [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use continuum_types::LiveEvent;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming live events.
///
/// # Route
///
/// `GET /ws/events`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Forward every broadcast event to the socket until either side closes.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        let frame = match event_frame(&event) {
                            Ok(frame) => frame,
                            Err(e) => {
                                warn!(error = %e, "Failed to serialize live event");
                                continue;
                            }
                        };
                        if socket.send(frame).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket error");
                        return;
                    }
                    // Clients only listen.
                    _ => {}
                }
            }
        }
    }
}

/// Encode one event as a JSON text frame.
fn event_frame(event: &LiveEvent) -> Result<Message, serde_json::Error> {
    serde_json::to_string(event).map(|json| Message::Text(json.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::DateTime;
    use continuum_core::clock::ManualClock;
    use continuum_core::config::FeedConfig;
    use continuum_core::{MemoryStore, TurnEngine, TurnTimings};
    use serde_json::Value;

    use super::*;

    fn decode(frame: Message) -> Value {
        let text = frame.into_text().unwrap();
        serde_json::from_str(text.as_str()).unwrap()
    }

    #[tokio::test]
    async fn join_streams_turn_then_queue_frames() {
        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let engine = TurnEngine::open(
            TurnTimings::default(),
            Arc::new(clock),
            Arc::new(MemoryStore::new()),
            50,
        )
        .unwrap();
        let state = AppState::new(Arc::new(engine), FeedConfig::default());
        let mut rx = state.subscribe();

        let ada = state.engine.register("ada").await.unwrap();
        state.engine.join(ada.id).await.unwrap();

        let turn = decode(event_frame(&rx.recv().await.unwrap()).unwrap());
        assert_eq!(turn["type"], "turn_update");
        assert_eq!(turn["holder"], ada.id.to_string());
        assert_eq!(turn["nickname"], "ada");
        assert_eq!(turn["turn_seconds"], 120);

        let queue = decode(event_frame(&rx.recv().await.unwrap()).unwrap());
        assert_eq!(queue["type"], "queue_update");
        assert_eq!(queue["queue"].as_array().map(Vec::len), Some(0));
    }
}
