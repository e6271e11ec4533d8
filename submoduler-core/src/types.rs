//! Domain types for resolved repositories.
//!
//! A [`RepoMeta`] is produced once per repository during resolution and then
//! moved into exactly one sync worker. It is deliberately not `Clone`: the
//! [`WorkingCopy`] it carries is owned by that worker alone.

use std::fmt;
use std::path::{Path, PathBuf};

/// Commit message used when a repository has no template configured.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update submodules to latest revision";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed repository name, unique within one resolution run.
///
/// Explicit repos use their config key; organization repos use `<org>/<repo>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoName(pub String);

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Commit message template. Supports `{repo}` and `{date}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTemplate(String);

impl CommitTemplate {
    /// Use `template` if given and non-blank, else [`DEFAULT_COMMIT_MESSAGE`].
    pub fn new(template: Option<String>) -> Self {
        match template {
            Some(t) if !t.trim().is_empty() => Self(t),
            _ => Self(DEFAULT_COMMIT_MESSAGE.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn render(&self, repo: &RepoName, date: &str) -> String {
        self.0.replace("{repo}", &repo.0).replace("{date}", date)
    }
}

impl Default for CommitTemplate {
    fn default() -> Self {
        Self::new(None)
    }
}

// ---------------------------------------------------------------------------
// Working copy handle
// ---------------------------------------------------------------------------

/// An opened, non-bare working copy on disk.
#[derive(Debug, PartialEq, Eq)]
pub struct WorkingCopy {
    root: PathBuf,
}

impl WorkingCopy {
    /// Open the working copy rooted at `root`; requires a `.git` entry
    /// (directory, or file for linked worktrees).
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        if !root.join(".git").exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a git working copy", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

// ---------------------------------------------------------------------------
// RepoMeta
// ---------------------------------------------------------------------------

/// Where a resolved repository came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    /// Listed under `repos:`.
    Explicit,
    /// Discovered by expanding the named organization.
    Organization(String),
}

/// One resolved, locally materialized repository.
#[derive(Debug)]
pub struct RepoMeta {
    pub name: RepoName,
    pub remote_url: String,
    pub local_path: PathBuf,
    pub track_latest_revision: bool,
    pub commit_template: CommitTemplate,
    pub source: RepoSource,
    pub handle: WorkingCopy,
}
