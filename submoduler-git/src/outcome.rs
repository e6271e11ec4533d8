//! Tagged results for git invocations.

use std::fmt;

/// Which git primitive produced an output; classification depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitCommand {
    Clone,
    Fetch,
    Pull,
    SubmoduleInit,
    SubmoduleUpdate,
    Stage,
    Commit,
    Push,
}

impl GitCommand {
    pub fn label(&self) -> &'static str {
        match self {
            GitCommand::Clone => "clone",
            GitCommand::Fetch => "fetch",
            GitCommand::Pull => "pull",
            GitCommand::SubmoduleInit => "submodule init",
            GitCommand::SubmoduleUpdate => "submodule update",
            GitCommand::Stage => "add",
            GitCommand::Commit => "commit",
            GitCommand::Push => "push",
        }
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOutcome {
    Ok,
    /// The command succeeded without changing anything (nothing to commit or push).
    NothingToDo,
    /// Clone destination is already populated.
    AlreadyExists,
    AuthError(String),
    NetworkError(String),
    /// Merge conflict, rejected push, or a pull that cannot fast-forward.
    ConflictError(String),
    Failed(String),
}

const AUTH_MARKERS: &[&str] = &[
    "Authentication failed",
    "could not read Username",
    "could not read Password",
    "Permission denied",
    "Invalid username or password",
    "The requested URL returned error: 401",
    "The requested URL returned error: 403",
];

const NETWORK_MARKERS: &[&str] = &[
    "Could not resolve host",
    "unable to access",
    "Connection refused",
    "Connection timed out",
    "timed out",
    "Could not read from remote repository",
    "does not appear to be a git repository",
];

const CONFLICT_MARKERS: &[&str] = &[
    "CONFLICT",
    "non-fast-forward",
    "[rejected]",
    "Not possible to fast-forward",
    "diverging branches",
    "fetch first",
];

impl GitOutcome {
    /// Classify a finished invocation from its exit status and captured output.
    pub fn classify(command: GitCommand, success: bool, stdout: &str, stderr: &str) -> Self {
        let combined = format!("{stdout}\n{stderr}");

        if success {
            if command == GitCommand::Push && combined.contains("Everything up-to-date") {
                return GitOutcome::NothingToDo;
            }
            return GitOutcome::Ok;
        }

        if command == GitCommand::Clone && combined.contains("already exists and is not an empty directory") {
            return GitOutcome::AlreadyExists;
        }
        if command == GitCommand::Commit
            && (combined.contains("nothing to commit")
                || combined.contains("nothing added to commit")
                || combined.contains("no changes added to commit"))
        {
            return GitOutcome::NothingToDo;
        }

        let message = failure_message(stdout, stderr);
        if contains_any(&combined, AUTH_MARKERS) {
            GitOutcome::AuthError(message)
        } else if contains_any(&combined, CONFLICT_MARKERS) {
            GitOutcome::ConflictError(message)
        } else if contains_any(&combined, NETWORK_MARKERS) {
            GitOutcome::NetworkError(message)
        } else {
            GitOutcome::Failed(message)
        }
    }

    /// `Ok` or `NothingToDo`.
    pub fn is_success(&self) -> bool {
        matches!(self, GitOutcome::Ok | GitOutcome::NothingToDo)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success() && *self != GitOutcome::AlreadyExists
    }

    pub fn label(&self) -> &'static str {
        match self {
            GitOutcome::Ok => "ok",
            GitOutcome::NothingToDo => "nothing_to_do",
            GitOutcome::AlreadyExists => "already_exists",
            GitOutcome::AuthError(_) => "auth_error",
            GitOutcome::NetworkError(_) => "network_error",
            GitOutcome::ConflictError(_) => "conflict_error",
            GitOutcome::Failed(_) => "failed",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            GitOutcome::AuthError(m)
            | GitOutcome::NetworkError(m)
            | GitOutcome::ConflictError(m)
            | GitOutcome::Failed(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for GitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {}", self.label(), message),
            None => f.write_str(self.label()),
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Prefer stderr; fall back to stdout, then to a generic message.
fn failure_message(stdout: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    "git exited with a non-zero status".to_string()
}
