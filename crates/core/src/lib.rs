// crates/core/src/lib.rs
//! taillight-core: the tail engine behind the taillight log viewer.
//!
//! Extracts the last N lines of arbitrarily large files, tracks per-file
//! byte offsets to stream only newly appended content, fans a single file
//! watcher out to many subscribers, and maintains the session ↔ file
//! subscription graph.

pub mod error;
pub mod registry;
pub mod session;
mod stream;
pub mod tail;
pub mod watcher;

pub use error::{TailError, WatchError};
pub use registry::{Registry, DEFAULT_BACKFILL};
pub use session::{handle_inbound, ClientHandle, Outbound, SessionId};
pub use watcher::FileWatcher;
