//! Filesystem layout.
//!
//! ```text
//! <home>/
//!   .git-credentials           (single HTTPS credential line, mode 0600)
//!   submoduler/
//!     daemon.sock              (control socket while the daemon runs)
//!     repos/
//!       <repo>/                (explicit repos)
//!       <org>/<repo>/          (organization-discovered repos)
//! ```
//!
//! Every helper takes an explicit `home` so tests can root it in a `TempDir`.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DAEMON_SOCKET: &str = "daemon.sock";
pub const CREDENTIAL_FILE: &str = ".git-credentials";

pub fn submoduler_root(home: &Path) -> PathBuf {
    home.join("submoduler")
}

/// Cache root holding one working copy per resolved repository.
pub fn repos_root(home: &Path) -> PathBuf {
    submoduler_root(home).join("repos")
}

pub fn socket_path(home: &Path) -> PathBuf {
    submoduler_root(home).join(DAEMON_SOCKET)
}

pub fn credential_file(home: &Path) -> PathBuf {
    home.join(CREDENTIAL_FILE)
}

/// `<cache_root>/<name>`: pure, no I/O.
pub fn repo_path(cache_root: &Path, name: &str) -> PathBuf {
    cache_root.join(name)
}

/// `<cache_root>/<org>/<repo>`: pure, no I/O.
pub fn org_repo_path(cache_root: &Path, org: &str, repo: &str) -> PathBuf {
    cache_root.join(org).join(repo)
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
