//! Subscription registry: the single coordinator of the session ↔ file
//! graph and of per-file stream lifecycles.
//!
//! A stream exists exactly while it has subscribers. The first attach to a
//! path creates its stream (backfill, status notice, watcher); the last
//! detach or disconnect destroys it and releases the watcher. Map
//! mutations happen under one async mutex whose critical sections contain
//! no file I/O — the backfill read and watcher acquisition run outside it,
//! so one slow or huge file cannot stall attaches and detaches for every
//! other client.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::session::{ClientHandle, SessionId};
use crate::stream::FileStream;
use crate::tail;
use crate::watcher::FileWatcher;

/// Number of backfill lines delivered at attach time.
pub const DEFAULT_BACKFILL: usize = 10;

pub struct Registry {
    inner: Mutex<Inner>,
    backfill: usize,
}

#[derive(Default)]
struct Inner {
    streams: HashMap<PathBuf, StreamEntry>,
    sessions: HashMap<SessionId, HashSet<PathBuf>>,
}

/// A live stream plus the resources torn down with it. Dropping the entry
/// releases the watcher, which closes the signal channel; the task is
/// aborted as well so no further events are sent from an in-flight cycle.
struct StreamEntry {
    stream: Arc<FileStream>,
    _watcher: FileWatcher,
    task: JoinHandle<()>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_backfill(DEFAULT_BACKFILL)
    }

    pub fn with_backfill(backfill: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            backfill,
        }
    }

    /// Subscribe `client` to `path`.
    ///
    /// On success the client receives up to the configured backfill of
    /// recent lines followed by a status notice, and from then on every
    /// line appended to the file. On failure the client receives an error
    /// notice and no state is recorded.
    ///
    /// Concurrent attaches to a path nobody watches race to publish its
    /// stream; the loser joins the winner's stream and its own watcher is
    /// dropped.
    pub async fn attach(&self, client: &ClientHandle, path: PathBuf) {
        // Backfill read for this subscriber, outside the registry lock.
        // For the first subscriber the end offset doubles as the stream's
        // initial offset; for a later one the stream's offset is not reset,
        // so the backfill window may overlap with lines that also arrive
        // live.
        let (lines, offset) = match tail::last_lines(&path, self.backfill).await {
            Ok(read) => read,
            Err(e) => {
                client.send_error(e.to_string());
                return;
            }
        };
        for line in lines {
            client.send_line(&path, line);
        }
        client.send_status(format!("Now watching {}", path.display()));

        {
            let mut inner = self.inner.lock().await;
            if let Some(stream) = inner.streams.get(&path).map(|e| Arc::clone(&e.stream)) {
                stream.add_subscriber(client.clone());
                inner.sessions.entry(client.id()).or_default().insert(path);
                return;
            }
        }

        // First subscriber: acquire the watcher (again outside the lock),
        // then publish the stream.
        let (signal_tx, signal_rx) = FileWatcher::channel();
        let watcher = match FileWatcher::watch(&path, signal_tx) {
            Ok(w) => w,
            Err(e) => {
                client.send_error(e.to_string());
                return;
            }
        };

        let mut inner = self.inner.lock().await;
        match inner.streams.get(&path).map(|e| Arc::clone(&e.stream)) {
            Some(stream) => {
                // Another session published this path while we were
                // acquiring the watcher; join it and let ours drop.
                stream.add_subscriber(client.clone());
            }
            None => {
                let stream = Arc::new(FileStream::new(path.clone(), offset, client.clone()));
                let task = tokio::spawn(Arc::clone(&stream).run(signal_rx));
                inner.streams.insert(
                    path.clone(),
                    StreamEntry {
                        stream,
                        _watcher: watcher,
                        task,
                    },
                );
                info!(path = %path.display(), "now tailing");
            }
        }
        inner
            .sessions
            .entry(client.id())
            .or_default()
            .insert(path);
    }

    /// Unsubscribe `session` from `path`. A no-op if not subscribed.
    pub async fn detach(&self, session: SessionId, path: &Path) {
        let mut inner = self.inner.lock().await;
        Self::detach_locked(&mut inner, session, path);
    }

    /// Tear down every subscription held by `session` and forget it.
    pub async fn disconnect(&self, session: SessionId) {
        let mut inner = self.inner.lock().await;
        let paths = inner.sessions.remove(&session).unwrap_or_default();
        for path in &paths {
            Self::detach_locked(&mut inner, session, path);
        }
        debug!(session = %session, paths = paths.len(), "session disconnected");
    }

    fn detach_locked(inner: &mut Inner, session: SessionId, path: &Path) {
        if let Some(paths) = inner.sessions.get_mut(&session) {
            paths.remove(path);
        }
        let now_empty = match inner.streams.get(path) {
            Some(entry) => entry.stream.remove_subscriber(session) == 0,
            None => false,
        };
        if now_empty {
            if let Some(entry) = inner.streams.remove(path) {
                entry.task.abort();
                debug!(path = %path.display(), "last subscriber left, watcher released");
            }
        }
    }

    /// Drop every stream and session without sending further events.
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        for (_, entry) in inner.streams.drain() {
            entry.task.abort();
        }
        inner.sessions.clear();
        info!("tail engine shut down");
    }

    /// Number of live per-file streams.
    pub async fn stream_count(&self) -> usize {
        self.inner.lock().await.streams.len()
    }

    /// Whether `path` currently has a live stream (and therefore a watcher).
    pub async fn is_watching(&self, path: &Path) -> bool {
        self.inner.lock().await.streams.contains_key(path)
    }

    /// Subscriber count for `path`, or 0 when it is not being watched.
    pub async fn subscriber_count(&self, path: &Path) -> usize {
        self.inner
            .lock()
            .await
            .streams
            .get(path)
            .map(|e| e.stream.subscriber_count())
            .unwrap_or(0)
    }

    /// Paths with live streams and their subscriber counts.
    pub async fn watched(&self) -> Vec<(PathBuf, usize)> {
        self.inner
            .lock()
            .await
            .streams
            .iter()
            .map(|(path, entry)| (path.clone(), entry.stream.subscriber_count()))
            .collect()
    }
}
