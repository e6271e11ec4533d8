//! One independent task per resolved repository, cancelled together.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use submoduler_core::{RepoMeta, RepoName};
use submoduler_git::{CredentialContext, GitOperations};

use crate::status::SharedStatus;
use crate::worker::SyncWorker;

pub struct SyncWorkerPool {
    shutdown_tx: broadcast::Sender<()>,
    workers: Vec<(RepoName, JoinHandle<()>)>,
    status: SharedStatus,
}

impl SyncWorkerPool {
    /// Spawn one worker per repo and return immediately.
    ///
    /// Must be called from within a Tokio runtime. Workers run until
    /// [`shutdown`](Self::shutdown) or until the pool is dropped.
    pub fn start(
        repos: Vec<RepoMeta>,
        interval: Duration,
        ctx: Arc<CredentialContext>,
        git: Arc<dyn GitOperations>,
        status: SharedStatus,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel::<()>(4);
        let workers = repos
            .into_iter()
            .map(|repo| {
                let name = repo.name.clone();
                let worker = SyncWorker::new(repo, git.clone(), ctx.clone());
                let handle = tokio::spawn(worker.run(
                    interval,
                    status.clone(),
                    shutdown_tx.subscribe(),
                ));
                (name, handle)
            })
            .collect::<Vec<_>>();

        tracing::info!(
            workers = workers.len(),
            interval_secs = interval.as_secs(),
            "sync workers launched",
        );
        Self {
            shutdown_tx,
            workers,
            status,
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    /// Signal every worker to stop after its current cycle.
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Cancel, then wait up to `grace` for workers to finish their in-flight
    /// cycle. Workers still busy after that are aborted.
    pub async fn shutdown(self, grace: Duration) {
        self.cancel();
        let deadline = tokio::time::Instant::now() + grace;
        for (name, mut handle) in self.workers {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(repo = %name, error = %err, "sync worker task failed");
                }
                Err(_) => {
                    tracing::warn!(repo = %name, "sync worker still busy at shutdown; aborting");
                    handle.abort();
                }
            }
        }
    }
}
