//! [`GitOperations`] backed by the system `git` binary.
//!
//! Each call is a blocking child process. Identity and credential helper are
//! passed explicitly with `-c` flags from the [`CredentialContext`], and
//! `HOME` is pinned to the context's home, so no call depends on whatever
//! ambient configuration the process happens to inherit.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, instrument};

use crate::credentials::CredentialContext;
use crate::outcome::{GitCommand, GitOutcome};
use crate::GitOperations;

#[derive(Debug, Clone)]
pub struct SystemGit {
    binary: PathBuf,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new("git")
    }
}

impl SystemGit {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, ctx: &CredentialContext, cwd: Option<&Path>) -> Command {
        let creds = ctx.credentials();
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-c")
            .arg(format!("user.name={}", creds.username()))
            .arg("-c")
            .arg(format!("user.email={}", creds.email()))
            // An empty helper resets the inherited list before adding ours.
            .arg("-c")
            .arg("credential.helper=")
            .arg("-c")
            .arg(format!(
                "credential.helper=store --file=\"{}\"",
                ctx.credential_file().display()
            ));
        cmd.env("HOME", ctx.home());
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }

    fn run(
        &self,
        ctx: &CredentialContext,
        cwd: Option<&Path>,
        kind: GitCommand,
        args: &[&str],
    ) -> GitOutcome {
        let mut cmd = self.command(ctx, cwd);
        cmd.args(args);

        debug!(command = %kind, ?args, "spawning git");
        let output = match cmd.output() {
            Ok(output) => output,
            Err(err) => {
                return GitOutcome::Failed(format!("failed to spawn git {kind}: {err}"));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let outcome = GitOutcome::classify(kind, output.status.success(), &stdout, &stderr);
        debug!(command = %kind, status = %output.status, outcome = outcome.label(), "git finished");
        outcome
    }
}

impl GitOperations for SystemGit {
    #[instrument(skip(self, ctx, dest), fields(dest = %dest.display()))]
    fn clone_repo(&self, ctx: &CredentialContext, url: &str, dest: &Path) -> GitOutcome {
        if let Some(parent) = dest.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                return GitOutcome::Failed(format!(
                    "cannot create {}: {err}",
                    parent.display()
                ));
            }
        }
        let dest = dest.to_string_lossy();
        self.run(ctx, None, GitCommand::Clone, &["clone", url, dest.as_ref()])
    }

    #[instrument(skip(self, ctx, repo), fields(repo = %repo.display()))]
    fn pull(&self, ctx: &CredentialContext, repo: &Path) -> GitOutcome {
        let fetched = self.run(ctx, Some(repo), GitCommand::Fetch, &["fetch", "--prune"]);
        if !fetched.is_success() {
            return fetched;
        }
        self.run(ctx, Some(repo), GitCommand::Pull, &["pull", "--ff-only", "--no-rebase"])
    }

    #[instrument(skip(self, ctx, repo), fields(repo = %repo.display()))]
    fn init_submodules(&self, ctx: &CredentialContext, repo: &Path) -> GitOutcome {
        self.run(
            ctx,
            Some(repo),
            GitCommand::SubmoduleInit,
            &["submodule", "update", "--init", "--recursive"],
        )
    }

    #[instrument(skip(self, ctx, repo), fields(repo = %repo.display()))]
    fn update_submodules(
        &self,
        ctx: &CredentialContext,
        repo: &Path,
        to_latest: bool,
    ) -> GitOutcome {
        let mut args = vec!["submodule", "update", "--init", "--recursive"];
        if to_latest {
            args.push("--remote");
        }
        self.run(ctx, Some(repo), GitCommand::SubmoduleUpdate, &args)
    }

    #[instrument(skip(self, ctx, repo), fields(repo = %repo.display()))]
    fn stage_all(&self, ctx: &CredentialContext, repo: &Path) -> GitOutcome {
        self.run(ctx, Some(repo), GitCommand::Stage, &["add", "--all"])
    }

    #[instrument(skip(self, ctx, repo), fields(repo = %repo.display()))]
    fn commit(&self, ctx: &CredentialContext, repo: &Path, message: &str) -> GitOutcome {
        self.run(ctx, Some(repo), GitCommand::Commit, &["commit", "-m", message])
    }

    #[instrument(skip(self, ctx, repo), fields(repo = %repo.display()))]
    fn push(&self, ctx: &CredentialContext, repo: &Path) -> GitOutcome {
        self.run(ctx, Some(repo), GitCommand::Push, &["push"])
    }
}
