// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the tail reader operations.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TailError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors from acquiring a file watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Watcher unavailable for {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

impl WatchError {
    pub fn notify(path: impl Into<PathBuf>, source: notify::Error) -> Self {
        let path = path.into();
        match source.kind {
            notify::ErrorKind::PathNotFound => Self::NotFound { path },
            _ => Self::Unavailable { path, source },
        }
    }
}
