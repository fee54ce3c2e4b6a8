//! API route handlers for the taillight server.

pub mod files;
pub mod health;
pub mod status;
pub mod ws;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - GET /api/health - Health check
/// - GET /api/files - Files available for tailing, newest first
/// - GET /api/status - Watched files with subscriber counts
/// - WS  /ws - Subscription protocol (watch/unwatch in; line/status/error out)
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", files::router())
        .nest("/api", status::router())
        .merge(ws::router())
        .with_state(state)
}
