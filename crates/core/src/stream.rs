//! Per-file stream: one shared reader behind all subscribers of a path.
//!
//! A stream owns the file's live byte offset and the set of sessions to fan
//! new lines out to. Its task drains the watcher's coalesced signals; each
//! signal triggers one read-and-deliver cycle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::TailError;
use crate::session::{ClientHandle, SessionId};
use crate::tail;

pub(crate) struct FileStream {
    path: PathBuf,
    /// Boundary between delivered and not-yet-delivered content. The async
    /// mutex is held across the read so change handling for this file is
    /// serialized and the offset advances monotonically.
    offset: tokio::sync::Mutex<u64>,
    subscribers: Mutex<HashMap<SessionId, ClientHandle>>,
}

impl FileStream {
    pub(crate) fn new(path: PathBuf, offset: u64, first: ClientHandle) -> Self {
        let mut subscribers = HashMap::new();
        subscribers.insert(first.id(), first);
        Self {
            path,
            offset: tokio::sync::Mutex::new(offset),
            subscribers: Mutex::new(subscribers),
        }
    }

    pub(crate) fn add_subscriber(&self, client: ClientHandle) {
        self.subscribers
            .lock()
            .expect("subscriber map poisoned")
            .insert(client.id(), client);
    }

    /// Remove a subscriber, returning how many remain.
    pub(crate) fn remove_subscriber(&self, id: SessionId) -> usize {
        let mut subs = self.subscribers.lock().expect("subscriber map poisoned");
        subs.remove(&id);
        subs.len()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber map poisoned")
            .len()
    }

    /// Drain change signals until the watcher (the sender side) is dropped.
    pub(crate) async fn run(self: Arc<Self>, mut signals: mpsc::Receiver<()>) {
        while signals.recv().await.is_some() {
            self.poll_changes().await;
        }
        debug!(path = %self.path.display(), "change signal channel closed");
    }

    /// One change cycle: read lines past the offset and fan them out.
    async fn poll_changes(&self) {
        let mut offset = self.offset.lock().await;
        let (lines, new_offset) = match tail::lines_since(&self.path, *offset).await {
            Ok(read) => read,
            Err(TailError::NotFound { .. }) => {
                // Transient (the file may be mid-replace): keep the offset
                // and let the next signal retry.
                debug!(path = %self.path.display(), "watched file missing, retrying on next signal");
                return;
            }
            Err(e) => {
                // Offset untouched; this cycle is abandoned.
                warn!(path = %self.path.display(), error = %e, "read failed, skipping change cycle");
                return;
            }
        };
        *offset = new_offset;
        drop(offset);

        if lines.is_empty() {
            // Spurious or already-coalesced signal.
            return;
        }

        // Snapshot subscribers so no lock is held across delivery.
        let subscribers: Vec<ClientHandle> = self
            .subscribers
            .lock()
            .expect("subscriber map poisoned")
            .values()
            .cloned()
            .collect();
        for line in lines {
            for subscriber in &subscribers {
                subscriber.send_line(&self.path, line.clone());
            }
        }
    }
}
