//! Error types for submoduler-resolver. Every variant aborts resolution.

use std::path::PathBuf;

use thiserror::Error;

use submoduler_core::ConfigError;
use submoduler_git::GitOutcome;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Any clone outcome other than success or "destination already exists".
    #[error("failed to clone '{name}' from {url} into {}: {outcome}", .path.display())]
    Clone {
        name: String,
        url: String,
        path: PathBuf,
        outcome: GitOutcome,
    },

    #[error("{} is not a usable working copy: {source}", .path.display())]
    NotAWorkingCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("listing repositories of organization '{org}' failed: {message}")]
    HostApi { org: String, message: String },
}
