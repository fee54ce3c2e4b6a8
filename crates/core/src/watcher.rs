//! Single-file change watcher.
//!
//! Bridges a `notify` watcher into async as a payload-free "something
//! changed, go look" signal. Signals carry no data and may be coalesced or
//! spurious; the consumer verifies by reading the file.

use std::path::Path;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::WatchError;

/// Handle on an active single-file watch. Dropping it releases the watch
/// and closes the signal channel.
#[derive(Debug)]
pub struct FileWatcher {
    _inner: RecommendedWatcher,
}

impl FileWatcher {
    /// Create the signal channel a watcher feeds.
    ///
    /// A single pending slot: bursts of modifications coalesce into one
    /// wake-up, and a signal arriving while the consumer is mid-read lands
    /// in the slot so nothing is missed across a quiescent period.
    pub fn channel() -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
        mpsc::channel(1)
    }

    /// Start watching `path` for appends, signalling through `tx`.
    ///
    /// Watches the file's parent directory (notify cannot watch individual
    /// files on all platforms) and filters events to the target path.
    pub fn watch(path: &Path, tx: mpsc::Sender<()>) -> Result<FileWatcher, WatchError> {
        if !path.exists() {
            return Err(WatchError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let target = path.to_path_buf();
        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        if !event.paths.iter().any(|p| p == &target) {
                            return;
                        }
                        match event.kind {
                            EventKind::Modify(_) | EventKind::Create(_) => {
                                // Full channel means a signal is already
                                // pending; this change is covered by it.
                                let _ = tx.try_send(());
                            }
                            _ => {}
                        }
                    }
                    Err(e) => {
                        warn!(path = %target.display(), error = %e, "file watcher error");
                    }
                }
            })
            .map_err(|e| WatchError::notify(path, e))?;

        let watch_dir = path.parent().unwrap_or_else(|| Path::new("."));
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::notify(path, e))?;

        Ok(FileWatcher { _inner: watcher })
    }
}
