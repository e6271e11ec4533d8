//! Error types for submoduler-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file did not exist at the given path.
    #[error("config file not found at {path}")]
    NotFound { path: PathBuf },

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `interval` must be a positive number of seconds.
    #[error("interval must be a positive number of seconds")]
    InvalidInterval,

    /// At most one organization entry is supported.
    #[error("at most one organization may be configured, found {}: {}", .names.len(), .names.join(", "))]
    MultipleOrganizations { names: Vec<String> },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
