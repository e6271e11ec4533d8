//! In-memory status board, one entry per sync worker.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use submoduler_core::{RepoMeta, RepoSource};

use crate::worker::CycleOutcome;

pub type SharedStatus = Arc<RwLock<StatusBoard>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoStatus {
    pub name: String,
    pub local_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub cycles: u64,
    pub updates: u64,
    pub failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// 0 until the first cycle completes.
    pub last_cycle_at_unix: u64,
    /// 0 until the first successful push.
    pub last_update_at_unix: u64,
}

/// What a `status` request sees: the board at one instant, optionally narrowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub running: bool,
    pub started_at_unix: u64,
    pub repos: Vec<RepoStatus>,
}

#[derive(Debug, Default)]
pub struct StatusBoard {
    started_at_unix: u64,
    repos: BTreeMap<String, RepoStatus>,
}

impl StatusBoard {
    pub fn new(started_at_unix: u64) -> Self {
        Self {
            started_at_unix,
            repos: BTreeMap::new(),
        }
    }

    pub fn shared(started_at_unix: u64) -> SharedStatus {
        Arc::new(RwLock::new(Self::new(started_at_unix)))
    }

    pub fn register(&mut self, repo: &RepoMeta) {
        let organization = match &repo.source {
            RepoSource::Explicit => None,
            RepoSource::Organization(org) => Some(org.clone()),
        };
        self.repos
            .entry(repo.name.0.clone())
            .or_insert_with(|| RepoStatus {
                name: repo.name.0.clone(),
                local_path: repo.local_path.display().to_string(),
                organization,
                ..Default::default()
            });
    }

    pub fn record(&mut self, name: &str, outcome: &CycleOutcome, at_unix: u64) {
        let entry = self
            .repos
            .entry(name.to_string())
            .or_insert_with(|| RepoStatus {
                name: name.to_string(),
                ..Default::default()
            });
        entry.cycles += 1;
        entry.last_cycle_at_unix = at_unix;
        entry.last_outcome = Some(outcome.label().to_string());
        entry.last_error = None;
        match outcome {
            CycleOutcome::Updated => {
                entry.updates += 1;
                entry.last_update_at_unix = at_unix;
            }
            CycleOutcome::UpToDate => {}
            CycleOutcome::Failed { .. } | CycleOutcome::Crashed(_) => {
                entry.failures += 1;
                entry.last_error = Some(outcome.to_string());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RepoStatus> {
        self.repos.get(name)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Copy of the board for the `status` command; `only` narrows it to one repo.
    pub fn snapshot(&self, only: Option<&str>) -> StatusSnapshot {
        StatusSnapshot {
            running: true,
            started_at_unix: self.started_at_unix,
            repos: self
                .repos
                .values()
                .filter(|r| only.map_or(true, |name| r.name == name))
                .cloned()
                .collect(),
        }
    }
}
