// crates/server/src/main.rs
//! Taillight server binary.
//!
//! Binds the HTTP/WebSocket server over a fresh tail engine. All
//! configuration comes from the environment; the engine itself takes only
//! the backfill size.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use taillight_core::{Registry, DEFAULT_BACKFILL};
use taillight_server::{create_app, AppState};

/// Default port for the server.
const DEFAULT_PORT: u16 = 9230;

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("TAILLIGHT_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Directory whose files the files API offers for tailing.
fn get_log_dir() -> PathBuf {
    std::env::var("TAILLIGHT_LOG_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Attach-time backfill size (lines).
fn get_backfill() -> usize {
    std::env::var("TAILLIGHT_BACKFILL")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_BACKFILL)
}

/// Get the static directory for serving frontend files.
///
/// Priority:
/// 1. STATIC_DIR environment variable (explicit override)
/// 2. ./dist directory (if it exists)
/// 3. None (API-only mode)
fn get_static_dir() -> Option<PathBuf> {
    std::env::var("STATIC_DIR")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            let dist = PathBuf::from("dist");
            dist.exists().then_some(dist)
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = Arc::new(Registry::with_backfill(get_backfill()));
    let log_dir = get_log_dir();
    let state = AppState::new(registry, log_dir.clone());
    let app = create_app(state, get_static_dir());

    let port = get_port();
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    eprintln!("\ntaillight v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "  serving {} \u{2192} http://localhost:{}\n",
        log_dir.display(),
        port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
