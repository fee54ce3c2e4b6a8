// crates/server/src/lib.rs
//! Taillight server library.
//!
//! This crate provides the axum-based HTTP/WebSocket surface over the tail
//! engine: a REST API for listing watchable files and inspecting live
//! streams, plus the WebSocket endpoint clients subscribe through.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::api_routes;
pub use state::AppState;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Create a CORS layer that only allows localhost origins.
///
/// This prevents cross-origin attacks where a malicious website could read
/// local log content via `fetch()` against the taillight port.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _req_parts: &axum::http::request::Parts| {
                if let Ok(origin) = origin.to_str() {
                    origin.starts_with("http://localhost:")
                        || origin.starts_with("http://127.0.0.1:")
                        || origin == "http://localhost"
                        || origin == "http://127.0.0.1"
                } else {
                    false
                }
            },
        ))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, files, status) and the /ws endpoint
/// - CORS restricted to localhost origins
/// - Request tracing
/// - Optional static file serving with SPA fallback when `static_dir` is set
pub fn create_app(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .merge(api_routes(state))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http());

    if let Some(dir) = static_dir {
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(&index)));
    }

    app
}
