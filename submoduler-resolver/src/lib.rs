//! # submoduler-resolver
//!
//! Turns a validated [`Config`](submoduler_core::Config) into locally
//! materialized repositories. Call [`RepoResolver::resolve`] once at startup;
//! it either returns every resolvable [`RepoMeta`](submoduler_core::RepoMeta)
//! or fails before any worker exists.

pub mod error;
pub mod host;
pub mod resolver;
pub mod scheme;

pub use error::ResolveError;
pub use host::{GitHubHost, RemoteRepo, RepositoryHost};
pub use resolver::{RepoResolver, Resolution, ResolveWarning};
pub use scheme::UrlScheme;
