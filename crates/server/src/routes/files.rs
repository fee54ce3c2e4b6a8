// crates/server/src/routes/files.rs
//! Listing of files available for tailing.

use std::sync::Arc;
use std::time::UNIX_EPOCH;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::error::ApiResult;
use crate::state::AppState;

/// One watchable file in the configured log directory.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct FileEntry {
    pub path: String,
    pub size_bytes: u64,
    /// Seconds since the Unix epoch, 0 when unavailable.
    pub modified_at: u64,
}

/// GET /api/files - list files available for tailing, newest first.
///
/// A missing log directory yields an empty list rather than an error, so a
/// freshly configured server comes up cleanly.
pub async fn list_files(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<FileEntry>>> {
    let dir = &state.log_dir;
    if !dir.exists() {
        warn!(dir = %dir.display(), "log directory does not exist");
        return Ok(Json(Vec::new()));
    }

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };
        if !meta.is_file() {
            continue;
        }
        let modified_at = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        entries.push(FileEntry {
            path: entry.path().display().to_string(),
            size_bytes: meta.len(),
            modified_at,
        });
    }
    entries.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));

    Ok(Json(entries))
}

/// Create the files routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/files", get(list_files))
}
