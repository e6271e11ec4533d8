//! Per-repository sync state machine.
//!
//! ```text
//! Idle → UpdatingSubmodules → Staging → Committing → Pushing → Idle
//! ```
//!
//! A cycle stops at the first failing step and the worker goes back to Idle;
//! the next cycle retries from the top after `interval`.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use tokio::sync::broadcast;

use submoduler_core::RepoMeta;
use submoduler_git::{CredentialContext, GitOperations, GitOutcome};

use crate::status::SharedStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    UpdatingSubmodules,
    Staging,
    Committing,
    Pushing,
}

impl SyncStep {
    pub fn label(&self) -> &'static str {
        match self {
            SyncStep::UpdatingSubmodules => "updating_submodules",
            SyncStep::Staging => "staging",
            SyncStep::Committing => "committing",
            SyncStep::Pushing => "pushing",
        }
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one pass through the four steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A pointer advance was committed (now or in an earlier cycle) and pushed.
    Updated,
    /// Nothing to commit and nothing to push.
    UpToDate,
    Failed { step: SyncStep, outcome: GitOutcome },
    /// The blocking cycle panicked or could not be joined.
    Crashed(String),
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Updated => "updated",
            CycleOutcome::UpToDate => "up_to_date",
            CycleOutcome::Failed { .. } => "failed",
            CycleOutcome::Crashed(_) => "crashed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::Failed { .. } | CycleOutcome::Crashed(_))
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Failed { step, outcome } => write!(f, "failed while {step}: {outcome}"),
            CycleOutcome::Crashed(message) => write!(f, "crashed: {message}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Owns one [`RepoMeta`] (and therefore its working copy) for the life of the process.
pub struct SyncWorker {
    repo: RepoMeta,
    git: Arc<dyn GitOperations>,
    ctx: Arc<CredentialContext>,
}

impl SyncWorker {
    pub fn new(repo: RepoMeta, git: Arc<dyn GitOperations>, ctx: Arc<CredentialContext>) -> Self {
        Self { repo, git, ctx }
    }

    pub fn repo(&self) -> &RepoMeta {
        &self.repo
    }

    /// One blocking pass: pull + advance submodules, stage, commit, push.
    pub fn run_cycle(&self) -> CycleOutcome {
        let git = self.git.as_ref();
        let ctx = self.ctx.as_ref();
        let path = self.repo.handle.root();

        let pulled = git.pull(ctx, path);
        if !pulled.is_success() {
            return failed(SyncStep::UpdatingSubmodules, pulled);
        }
        let advanced = git.update_submodules(ctx, path, self.repo.track_latest_revision);
        if !advanced.is_success() {
            return failed(SyncStep::UpdatingSubmodules, advanced);
        }

        let staged = git.stage_all(ctx, path);
        if !staged.is_success() {
            return failed(SyncStep::Staging, staged);
        }

        let message = self.commit_message();
        let committed = git.commit(ctx, path, &message);
        if !committed.is_success() {
            return failed(SyncStep::Committing, committed);
        }

        // Push even when nothing was committed: an earlier cycle's commit may
        // still be waiting after a failed push.
        match git.push(ctx, path) {
            GitOutcome::Ok => CycleOutcome::Updated,
            GitOutcome::NothingToDo => CycleOutcome::UpToDate,
            outcome => failed(SyncStep::Pushing, outcome),
        }
    }

    fn commit_message(&self) -> String {
        let date = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.repo.commit_template.render(&self.repo.name, &date)
    }

    /// Cycle, sleep `interval`, repeat until `shutdown` fires or its sender is dropped.
    ///
    /// A shutdown never interrupts a cycle in flight; it is observed during the sleep.
    pub async fn run(
        self,
        interval: Duration,
        status: SharedStatus,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let name = self.repo.name.0.clone();
        status.write().await.register(&self.repo);
        tracing::info!(repo = %name, path = %self.repo.local_path.display(), "sync worker started");

        let worker = Arc::new(self);
        loop {
            let started = Instant::now();
            let cycle = worker.clone();
            let outcome = match tokio::task::spawn_blocking(move || cycle.run_cycle()).await {
                Ok(outcome) => outcome,
                Err(err) => CycleOutcome::Crashed(err.to_string()),
            };
            log_outcome(&name, &outcome, started.elapsed());
            status.write().await.record(&name, &outcome, unix_seconds_now());

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        tracing::info!(repo = %name, "sync worker stopped");
    }
}

fn failed(step: SyncStep, outcome: GitOutcome) -> CycleOutcome {
    CycleOutcome::Failed { step, outcome }
}

fn log_outcome(name: &str, outcome: &CycleOutcome, elapsed: Duration) {
    let duration_ms = elapsed.as_millis();
    match outcome {
        CycleOutcome::Updated => {
            tracing::info!(repo = %name, duration_ms, "submodules advanced and pushed");
        }
        CycleOutcome::UpToDate => {
            tracing::debug!(repo = %name, duration_ms, "already up to date");
        }
        CycleOutcome::Failed { step, outcome } => {
            tracing::warn!(
                repo = %name,
                step = %step,
                outcome = outcome.label(),
                error = outcome.message().unwrap_or_default(),
                duration_ms,
                "sync cycle failed",
            );
        }
        CycleOutcome::Crashed(message) => {
            tracing::error!(repo = %name, error = %message, "sync cycle crashed");
        }
    }
}

pub(crate) fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    use submoduler_core::{CommitTemplate, RepoName, RepoSource, WorkingCopy};
    use submoduler_git::Credentials;
    use tempfile::TempDir;

    /// Replays scripted outcomes per operation; unscripted calls succeed.
    #[derive(Default)]
    struct ScriptedGit {
        pull: Mutex<VecDeque<GitOutcome>>,
        update: Mutex<VecDeque<GitOutcome>>,
        stage: Mutex<VecDeque<GitOutcome>>,
        commit: Mutex<VecDeque<GitOutcome>>,
        push: Mutex<VecDeque<GitOutcome>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGit {
        fn next(&self, op: &str, queue: &Mutex<VecDeque<GitOutcome>>) -> GitOutcome {
            self.calls.lock().unwrap().push(op.to_string());
            queue.lock().unwrap().pop_front().unwrap_or(GitOutcome::Ok)
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl GitOperations for ScriptedGit {
        fn clone_repo(&self, _: &CredentialContext, _: &str, _: &Path) -> GitOutcome {
            unreachable!("workers never clone")
        }
        fn pull(&self, _: &CredentialContext, _: &Path) -> GitOutcome {
            self.next("pull", &self.pull)
        }
        fn init_submodules(&self, _: &CredentialContext, _: &Path) -> GitOutcome {
            unreachable!("workers never init")
        }
        fn update_submodules(&self, _: &CredentialContext, _: &Path, to_latest: bool) -> GitOutcome {
            assert!(to_latest);
            self.next("update", &self.update)
        }
        fn stage_all(&self, _: &CredentialContext, _: &Path) -> GitOutcome {
            self.next("stage", &self.stage)
        }
        fn commit(&self, _: &CredentialContext, _: &Path, message: &str) -> GitOutcome {
            assert!(message.starts_with("bump services"), "message: {message}");
            self.next("commit", &self.commit)
        }
        fn push(&self, _: &CredentialContext, _: &Path) -> GitOutcome {
            self.next("push", &self.push)
        }
    }

    fn worker(dir: &TempDir, git: Arc<ScriptedGit>) -> SyncWorker {
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let repo = RepoMeta {
            name: RepoName::from("services"),
            remote_url: "https://github.com/acme/services.git".to_string(),
            local_path: dir.path().to_path_buf(),
            track_latest_revision: true,
            commit_template: CommitTemplate::new(Some("bump {repo} {date}".to_string())),
            source: RepoSource::Explicit,
            handle: WorkingCopy::open(dir.path()).unwrap(),
        };
        let creds = Credentials::new(Some("octo".into()), None, Some("t".into())).unwrap();
        let ctx = Arc::new(CredentialContext::new(creds, "github.com", dir.path()));
        SyncWorker::new(repo, git, ctx)
    }

    fn queue(outcomes: &[GitOutcome]) -> Mutex<VecDeque<GitOutcome>> {
        Mutex::new(outcomes.iter().cloned().collect())
    }

    #[test]
    fn full_cycle_with_commit_and_push_is_an_update() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit::default());
        let outcome = worker(&dir, git.clone()).run_cycle();
        assert_eq!(outcome, CycleOutcome::Updated);
        assert_eq!(git.calls(), vec!["pull", "update", "stage", "commit", "push"]);
    }

    #[test]
    fn nothing_to_commit_and_nothing_to_push_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit {
            commit: queue(&[GitOutcome::NothingToDo]),
            push: queue(&[GitOutcome::NothingToDo]),
            ..Default::default()
        });
        let outcome = worker(&dir, git.clone()).run_cycle();
        assert_eq!(outcome, CycleOutcome::UpToDate);
        assert!(!outcome.is_failure());
    }

    #[test]
    fn nothing_to_commit_still_publishes_an_earlier_commit() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit {
            commit: queue(&[GitOutcome::NothingToDo]),
            ..Default::default()
        });
        assert_eq!(worker(&dir, git).run_cycle(), CycleOutcome::Updated);
    }

    #[test]
    fn update_failure_stops_the_cycle_before_staging() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit {
            update: queue(&[GitOutcome::NetworkError("Could not resolve host".into())]),
            ..Default::default()
        });
        let outcome = worker(&dir, git.clone()).run_cycle();
        assert_eq!(
            outcome,
            CycleOutcome::Failed {
                step: SyncStep::UpdatingSubmodules,
                outcome: GitOutcome::NetworkError("Could not resolve host".into()),
            }
        );
        assert_eq!(git.calls(), vec!["pull", "update"]);
    }

    #[test]
    fn parent_pull_conflict_is_an_update_step_failure() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit {
            pull: queue(&[GitOutcome::ConflictError("diverging branches".into())]),
            ..Default::default()
        });
        let outcome = worker(&dir, git.clone()).run_cycle();
        assert!(matches!(
            outcome,
            CycleOutcome::Failed { step: SyncStep::UpdatingSubmodules, .. }
        ));
        assert_eq!(git.calls(), vec!["pull"]);
    }

    #[test]
    fn commit_failure_is_not_confused_with_nothing_to_commit() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit {
            commit: queue(&[GitOutcome::Failed("index.lock exists".into())]),
            ..Default::default()
        });
        let outcome = worker(&dir, git.clone()).run_cycle();
        assert!(matches!(outcome, CycleOutcome::Failed { step: SyncStep::Committing, .. }));
        assert!(!git.calls().contains(&"push".to_string()));
    }

    #[test]
    fn push_auth_failure_is_reported_not_swallowed() {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(ScriptedGit {
            push: queue(&[GitOutcome::AuthError("Authentication failed".into())]),
            ..Default::default()
        });
        let outcome = worker(&dir, git).run_cycle();
        assert!(outcome.is_failure());
        assert_eq!(
            outcome.to_string(),
            "failed while pushing: auth_error: Authentication failed"
        );
    }
}
