use std::path::PathBuf;

use thiserror::Error;

/// Error surface for daemon startup, runtime, and the control protocol.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] submoduler_core::ConfigError),

    #[error("credential error: {0}")]
    Credential(#[from] submoduler_git::CredentialError),

    #[error("resolution error: {0}")]
    Resolve(#[from] submoduler_resolver::ResolveError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("daemon protocol error: {0}")]
    Protocol(String),

    /// Another instance already answers on this socket.
    #[error("submoduler is already running (socket in use: {socket})")]
    AlreadyRunning { socket: PathBuf },

    #[error("daemon is not running (socket missing: {socket})")]
    DaemonNotRunning { socket: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
