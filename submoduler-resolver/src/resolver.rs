//! Clone-or-reuse resolution of configured repositories.
//!
//! Resolution is sequential and runs exactly once, before any worker starts:
//!
//! 1. explicit `repos` entries, in name order, under `<cache>/<name>`;
//! 2. the (single) organization's listing, under `<cache>/<org>/<repo>`.
//!
//! A clone into an already-populated directory counts as success so that a
//! restarted process reuses its earlier working copies. Every other clone
//! failure aborts the whole run.
//!
//! Working copies never nest: an organization repo that would land inside an
//! explicit repo of the same name as the organization is skipped.

use std::fmt;
use std::path::{Path, PathBuf};

use submoduler_core::{
    paths, CommitTemplate, Config, RepoMeta, RepoName, RepoSource, WorkingCopy,
};
use submoduler_git::{CredentialContext, GitOperations, GitOutcome};

use crate::error::ResolveError;
use crate::host::RepositoryHost;
use crate::scheme::UrlScheme;

/// A non-fatal problem; the affected entry is skipped or left for the next cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    UnrecognizedUrl { name: String, url: String },
    /// Name would escape or collide with the cache layout.
    InvalidName { name: String },
    DuplicateName { name: String },
    /// Working copy would sit inside, or contain, the one already claimed by `other`.
    OverlappingPath { name: String, other: String },
    /// Submodule init or parent pull failed after clone; the repo is still resolved.
    InitFailed {
        name: String,
        step: &'static str,
        outcome: GitOutcome,
    },
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveWarning::UnrecognizedUrl { name, url } => {
                write!(f, "skipping '{name}': unrecognized url '{url}'")
            }
            ResolveWarning::InvalidName { name } => {
                write!(f, "skipping '{name}': not usable as a directory name")
            }
            ResolveWarning::DuplicateName { name } => {
                write!(f, "skipping duplicate repository '{name}'")
            }
            ResolveWarning::OverlappingPath { name, other } => {
                write!(f, "skipping '{name}': its working copy would nest with '{other}'")
            }
            ResolveWarning::InitFailed {
                name,
                step,
                outcome,
            } => write!(f, "'{name}': {step} failed after clone: {outcome}"),
        }
    }
}

/// Output of one resolution run.
#[derive(Debug, Default)]
pub struct Resolution {
    pub repos: Vec<RepoMeta>,
    pub warnings: Vec<ResolveWarning>,
}

/// Everything needed to materialize one repository.
struct Planned {
    name: RepoName,
    url: String,
    path: PathBuf,
    track_latest_revision: bool,
    commit_template: CommitTemplate,
    source: RepoSource,
}

pub struct RepoResolver<'a> {
    git: &'a dyn GitOperations,
    host: &'a dyn RepositoryHost,
    ctx: &'a CredentialContext,
    cache_root: PathBuf,
}

impl<'a> RepoResolver<'a> {
    pub fn new(
        git: &'a dyn GitOperations,
        host: &'a dyn RepositoryHost,
        ctx: &'a CredentialContext,
        cache_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            git,
            host,
            ctx,
            cache_root: cache_root.into(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Resolve every configured repository.
    ///
    /// The config is re-validated first, so an invalid config (including more
    /// than one organization) fails before any clone or API call.
    pub fn resolve(&self, config: &Config) -> Result<Resolution, ResolveError> {
        config.validate()?;

        let mut resolution = Resolution::default();
        let mut claimed = Vec::new();

        for (name, entry) in &config.repos {
            let planned = Planned {
                name: RepoName::from(name.as_str()),
                url: entry.url.trim().to_string(),
                path: paths::repo_path(&self.cache_root, name),
                track_latest_revision: entry.to_latest_revision,
                commit_template: CommitTemplate::new(entry.commit_message.clone()),
                source: RepoSource::Explicit,
            };
            self.admit_and_materialize(planned, name, &mut claimed, &mut resolution)?;
        }

        if let Some((org, defaults)) = config.organization() {
            if !is_safe_component(org) {
                warn(&mut resolution, ResolveWarning::InvalidName { name: org.to_string() });
                return Ok(resolution);
            }
            let api_base = defaults.url.as_deref().unwrap_or(&config.api_url);
            let listed = self.host.list_organization_repos(api_base, org, self.ctx)?;
            tracing::info!(org = %org, count = listed.len(), "organization listing received");

            for remote in listed {
                let planned = Planned {
                    name: RepoName::from(format!("{org}/{}", remote.name)),
                    url: remote.clone_url.trim().to_string(),
                    path: paths::org_repo_path(&self.cache_root, org, &remote.name),
                    track_latest_revision: defaults.to_latest_revision,
                    commit_template: CommitTemplate::new(defaults.commit_message.clone()),
                    source: RepoSource::Organization(org.to_string()),
                };
                self.admit_and_materialize(planned, &remote.name, &mut claimed, &mut resolution)?;
            }
        }

        tracing::info!(
            resolved = resolution.repos.len(),
            warnings = resolution.warnings.len(),
            cache = %self.cache_root.display(),
            "resolution complete",
        );
        Ok(resolution)
    }

    /// Skip entries with unusable names/URLs, duplicate names or nested
    /// working copies, then materialize. Earlier entries keep their claim.
    fn admit_and_materialize(
        &self,
        planned: Planned,
        dir_name: &str,
        claimed: &mut Vec<(RepoName, PathBuf)>,
        resolution: &mut Resolution,
    ) -> Result<(), ResolveError> {
        if !is_safe_component(dir_name) {
            warn(resolution, ResolveWarning::InvalidName { name: planned.name.0 });
            return Ok(());
        }
        if UrlScheme::recognize(&planned.url).is_none() {
            warn(
                resolution,
                ResolveWarning::UnrecognizedUrl {
                    name: planned.name.0,
                    url: planned.url,
                },
            );
            return Ok(());
        }
        if claimed.iter().any(|(name, _)| *name == planned.name) {
            warn(resolution, ResolveWarning::DuplicateName { name: planned.name.0 });
            return Ok(());
        }
        if let Some((other, _)) = claimed
            .iter()
            .find(|(_, path)| path.starts_with(&planned.path) || planned.path.starts_with(path))
        {
            let other = other.0.clone();
            warn(
                resolution,
                ResolveWarning::OverlappingPath {
                    name: planned.name.0,
                    other,
                },
            );
            return Ok(());
        }
        claimed.push((planned.name.clone(), planned.path.clone()));

        let meta = self.materialize(planned, &mut resolution.warnings)?;
        resolution.repos.push(meta);
        Ok(())
    }

    fn materialize(
        &self,
        planned: Planned,
        warnings: &mut Vec<ResolveWarning>,
    ) -> Result<RepoMeta, ResolveError> {
        match self.git.clone_repo(self.ctx, &planned.url, &planned.path) {
            GitOutcome::Ok => {
                tracing::info!(repo = %planned.name, path = %planned.path.display(), "cloned");
            }
            GitOutcome::AlreadyExists => {
                tracing::info!(
                    repo = %planned.name,
                    path = %planned.path.display(),
                    "working copy already present; reusing",
                );
            }
            outcome => {
                return Err(ResolveError::Clone {
                    name: planned.name.0,
                    url: planned.url,
                    path: planned.path,
                    outcome,
                });
            }
        }

        let init = self.git.init_submodules(self.ctx, &planned.path);
        if !init.is_success() {
            let warning = ResolveWarning::InitFailed {
                name: planned.name.0.clone(),
                step: "submodule init",
                outcome: init,
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
        }
        let pulled = self.git.pull(self.ctx, &planned.path);
        if !pulled.is_success() {
            let warning = ResolveWarning::InitFailed {
                name: planned.name.0.clone(),
                step: "pull",
                outcome: pulled,
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
        }

        let handle = WorkingCopy::open(&planned.path).map_err(|source| {
            ResolveError::NotAWorkingCopy {
                path: planned.path.clone(),
                source,
            }
        })?;

        Ok(RepoMeta {
            name: planned.name,
            remote_url: planned.url,
            local_path: planned.path,
            track_latest_revision: planned.track_latest_revision,
            commit_template: planned.commit_template,
            source: planned.source,
            handle,
        })
    }
}

fn warn(resolution: &mut Resolution, warning: ResolveWarning) {
    tracing::warn!("{warning}");
    resolution.warnings.push(warning);
}

/// A single, non-traversing path component.
fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}
