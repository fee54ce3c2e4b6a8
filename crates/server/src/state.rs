// crates/server/src/state.rs
//! Application state for the axum server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use taillight_core::Registry;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// The tail engine.
    pub registry: Arc<Registry>,
    /// Directory listed by the files API.
    pub log_dir: PathBuf,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(registry: Arc<Registry>, log_dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            registry,
            log_dir,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
