//! Submoduler core library: configuration model, resolved repository types, paths.
//!
//! - [`config`]: typed YAML configuration, load + validate
//! - [`types`]: [`RepoMeta`], [`WorkingCopy`], [`RepoName`]
//! - [`paths`]: cache root and per-repo working-copy locations
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{Config, OrganizationEntry, RepoEntry, DEFAULT_API_URL, DEFAULT_HOST};
pub use error::ConfigError;
pub use types::{CommitTemplate, RepoMeta, RepoName, RepoSource, WorkingCopy};
