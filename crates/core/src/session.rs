//! Client sessions and the wire protocol they speak.
//!
//! A session is created per transport connection. The engine talks to it
//! only through a [`ClientHandle`]: a cloneable (id, sender) pair whose
//! delivery is best-effort — a session whose channel is full has that event
//! dropped, never buffered, so a slow client cannot stall a tail loop.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::registry::Registry;

/// Process-unique identifier for one connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

impl SessionId {
    fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events delivered from the engine to one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    /// One log line, terminator stripped.
    Line {
        data: String,
        #[serde(rename = "filePath")]
        file_path: String,
    },
    /// A subscription notice ("Now watching <path>").
    Status { message: String },
    /// An attach-time failure caused by this session's own request.
    Error { message: String },
}

/// Cloneable handle through which the engine delivers events to a session.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: SessionId,
    tx: mpsc::Sender<Outbound>,
}

impl ClientHandle {
    /// Wrap a fresh session around the transport's outbound channel.
    pub fn new(tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            id: SessionId::next(),
            tx,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn send(&self, event: Outbound) {
        if self.tx.try_send(event).is_err() {
            trace!(session = %self.id, "session not writable, dropping event");
        }
    }

    pub(crate) fn send_line(&self, path: &Path, data: String) {
        self.send(Outbound::Line {
            data,
            file_path: path.display().to_string(),
        });
    }

    pub(crate) fn send_status(&self, message: String) {
        self.send(Outbound::Status { message });
    }

    pub(crate) fn send_error(&self, message: String) {
        self.send(Outbound::Error { message });
    }
}

/// One inbound control message envelope.
#[derive(Debug, Deserialize)]
struct ControlMessage {
    #[serde(rename = "type")]
    msg_type: String,
    #[serde(rename = "filePath", default)]
    file_path: Option<String>,
}

/// Parse and dispatch one control message from a session's transport.
///
/// `watch` attaches, `unwatch` detaches. Malformed envelopes and unknown
/// message types are logged and dropped; neither terminates the session.
pub async fn handle_inbound(registry: &Registry, client: &ClientHandle, raw: &str) {
    let msg: ControlMessage = match serde_json::from_str(raw) {
        Ok(m) => m,
        Err(e) => {
            debug!(session = %client.id(), error = %e, "malformed control message, ignoring");
            return;
        }
    };

    match (msg.msg_type.as_str(), msg.file_path) {
        ("watch", Some(path)) => registry.attach(client, PathBuf::from(path)).await,
        ("unwatch", Some(path)) => registry.detach(client.id(), Path::new(&path)).await,
        ("watch" | "unwatch", None) => {
            debug!(
                session = %client.id(),
                kind = %msg.msg_type,
                "control message missing filePath, ignoring"
            );
        }
        (other, _) => {
            debug!(session = %client.id(), kind = %other, "unknown control message type, ignoring");
        }
    }
}
