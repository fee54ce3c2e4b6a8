// crates/server/src/routes/ws.rs
//! WebSocket endpoint speaking the taillight subscription protocol.
//!
//! Clients send `{"type":"watch","filePath":...}` and
//! `{"type":"unwatch","filePath":...}` control messages; the server pushes
//! `line`, `status`, and `error` events. One engine session per socket.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::ws::{Message, WebSocket},
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use taillight_core::{handle_inbound, ClientHandle, Outbound};
use tokio::sync::mpsc;

use crate::state::AppState;

/// Outbound channel capacity per session. This is the only buffering a
/// session gets; events beyond it are dropped rather than queued.
const OUTBOUND_CAPACITY: usize = 256;

/// Build the WebSocket sub-router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

/// Full session lifecycle: multiplex engine events onto the socket and
/// socket text frames into the engine, until either side goes away. Every
/// exit path funnels into `registry.disconnect`, which cascades detaches.
async fn handle_session(mut socket: WebSocket, state: Arc<AppState>) {
    let (tx, mut events) = mpsc::channel::<Outbound>(OUTBOUND_CAPACITY);
    let client = ClientHandle::new(tx);
    let session = client.id();

    tracing::info!(session = %session, "session connected");

    // Heartbeat uses protocol-level Ping frames; they fail fast on broken
    // TCP connections so stale sessions release their streams promptly.
    let mut heartbeat = tokio::time::interval(Duration::from_secs(15));
    heartbeat.tick().await; // skip the immediate first tick

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(t) => t,
                    Err(e) => {
                        tracing::error!(session = %session, error = %e, "failed to encode event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    tracing::debug!(session = %session, "client disconnected during send");
                    break;
                }
            }

            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound(&state.registry, &client, &text).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = socket.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(session = %session, "session disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(session = %session, error = %e, "receive error");
                        break;
                    }
                    _ => {} // Binary or Pong frames
                }
            }

            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    tracing::debug!(session = %session, "client disconnected during heartbeat");
                    break;
                }
            }
        }
    }

    state.registry.disconnect(session).await;
}
