//! # submoduler-git
//!
//! Version-control primitives behind the [`GitOperations`] trait, plus the
//! one-time credential bootstrap every network operation depends on.
//!
//! Every operation returns a [`GitOutcome`] instead of an error: callers
//! decide per step whether a failure is fatal (resolution) or just a warning
//! for this cycle (sync workers).

pub mod credentials;
pub mod error;
pub mod outcome;
pub mod system;

use std::path::Path;

pub use credentials::{CredentialContext, CredentialManager, Credentials};
pub use error::CredentialError;
pub use outcome::{GitCommand, GitOutcome};
pub use system::SystemGit;

/// Blocking version-control capability.
///
/// Implementations must be safe to share across worker tasks; each call only
/// touches the working copy it is given.
pub trait GitOperations: Send + Sync {
    /// Clone `url` into `dest`. An existing non-empty `dest` yields
    /// [`GitOutcome::AlreadyExists`].
    fn clone_repo(&self, ctx: &CredentialContext, url: &str, dest: &Path) -> GitOutcome;

    /// Fetch, then fast-forward the checked-out branch.
    fn pull(&self, ctx: &CredentialContext, repo: &Path) -> GitOutcome;

    /// Initialize and check out every submodule at its recorded pointer.
    fn init_submodules(&self, ctx: &CredentialContext, repo: &Path) -> GitOutcome;

    /// Recursively update submodules; `to_latest` follows each tracked remote branch tip.
    fn update_submodules(&self, ctx: &CredentialContext, repo: &Path, to_latest: bool)
        -> GitOutcome;

    /// Stage every working-tree change.
    fn stage_all(&self, ctx: &CredentialContext, repo: &Path) -> GitOutcome;

    /// Commit staged changes. Nothing staged yields [`GitOutcome::NothingToDo`].
    fn commit(&self, ctx: &CredentialContext, repo: &Path, message: &str) -> GitOutcome;

    /// Push the current branch. Nothing to publish yields [`GitOutcome::NothingToDo`].
    fn push(&self, ctx: &CredentialContext, repo: &Path) -> GitOutcome;
}
