//! Error types for submoduler-git.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the credential bootstrap. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("a username is required (pass --user or set $USER)")]
    MissingUsername,

    #[error("an access token is required (pass --pat or set $PAT)")]
    MissingToken,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `git config --global <key>` could not be written.
    #[error("failed to set git config {key}: {message}")]
    GitConfig { key: String, message: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CredentialError {
    CredentialError::Io {
        path: path.into(),
        source,
    }
}
