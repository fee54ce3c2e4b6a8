// crates/server/src/routes/status.rs
//! Engine introspection: which files are live and how many viewers each has.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct StatusResponse {
    pub watched_count: usize,
    pub watched: Vec<WatchedFile>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct WatchedFile {
    pub path: String,
    pub subscribers: usize,
}

/// GET /api/status - currently watched files with subscriber counts.
pub async fn engine_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let watched: Vec<WatchedFile> = state
        .registry
        .watched()
        .await
        .into_iter()
        .map(|(path, subscribers)| WatchedFile {
            path: path.display().to_string(),
            subscribers,
        })
        .collect();

    Json(StatusResponse {
        watched_count: watched.len(),
        watched,
    })
}

/// Create the status routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(engine_status))
}
