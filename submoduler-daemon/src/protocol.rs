//! Control socket wire format and the blocking client used by the CLI.
//!
//! One JSON object per line in each direction. Commands are tagged by `cmd`:
//!
//! ```text
//! -> {"cmd":"status","repo":"acme/api"}
//! <- {"reply":"status","running":true,"started_at_unix":...,"repos":[...]}
//! -> {"cmd":"stop"}
//! <- {"reply":"stopping"}
//! ```

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use submoduler_core::paths::socket_path;

use crate::error::{io_err, DaemonError};
use crate::status::StatusSnapshot;

/// Upper bound on waiting for a reply; the server answers from memory.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DaemonCommand {
    /// Read the status board, optionally for a single repository.
    Status {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repo: Option<String>,
    },
    /// Stop every worker and exit.
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum DaemonReply {
    Status(StatusSnapshot),
    Stopping,
    Error { message: String },
}

/// Send one command and wait for its reply.
pub fn send_command(home: &Path, command: &DaemonCommand) -> Result<DaemonReply, DaemonError> {
    let socket = socket_path(home);
    let mut stream = UnixStream::connect(&socket).map_err(|err| match err.kind() {
        ErrorKind::NotFound | ErrorKind::ConnectionRefused => DaemonError::DaemonNotRunning {
            socket: socket.clone(),
        },
        _ => io_err(&socket, err),
    })?;
    stream
        .set_read_timeout(Some(REPLY_TIMEOUT))
        .map_err(|e| io_err(&socket, e))?;

    let mut line = serde_json::to_string(command)?;
    line.push('\n');
    stream
        .write_all(line.as_bytes())
        .map_err(|e| io_err(&socket, e))?;

    let mut reply = String::new();
    if BufReader::new(stream)
        .read_line(&mut reply)
        .map_err(|e| io_err(&socket, e))?
        == 0
    {
        return Err(DaemonError::Protocol(
            "connection closed before a reply arrived".to_string(),
        ));
    }
    Ok(serde_json::from_str(reply.trim_end())?)
}

pub fn request_status(home: &Path, repo: Option<String>) -> Result<StatusSnapshot, DaemonError> {
    match send_command(home, &DaemonCommand::Status { repo })? {
        DaemonReply::Status(snapshot) => Ok(snapshot),
        other => Err(unexpected(other)),
    }
}

pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    match send_command(home, &DaemonCommand::Stop)? {
        DaemonReply::Stopping => Ok(()),
        other => Err(unexpected(other)),
    }
}

fn unexpected(reply: DaemonReply) -> DaemonError {
    match reply {
        DaemonReply::Error { message } => DaemonError::Protocol(message),
        other => DaemonError::Protocol(format!("unexpected reply: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_socket_means_not_running() {
        let home = TempDir::new().unwrap();
        let err = request_stop(home.path()).unwrap_err();
        assert!(matches!(err, DaemonError::DaemonNotRunning { .. }), "got {err}");
    }

    #[test]
    fn commands_are_tagged_by_cmd() {
        let status = DaemonCommand::Status { repo: None };
        assert_eq!(serde_json::to_string(&status).unwrap(), r#"{"cmd":"status"}"#);
        assert_eq!(
            serde_json::to_string(&DaemonCommand::Stop).unwrap(),
            r#"{"cmd":"stop"}"#
        );

        let parsed: DaemonCommand =
            serde_json::from_str(r#"{"cmd":"status","repo":"acme/api"}"#).unwrap();
        assert_eq!(
            parsed,
            DaemonCommand::Status {
                repo: Some("acme/api".to_string())
            }
        );
        assert!(serde_json::from_str::<DaemonCommand>(r#"{"cmd":"reload"}"#).is_err());
    }

    #[test]
    fn status_reply_flattens_the_snapshot() {
        let reply = DaemonReply::Status(StatusSnapshot {
            running: true,
            started_at_unix: 7,
            repos: Vec::new(),
        });
        let wire = serde_json::to_value(&reply).unwrap();
        assert_eq!(wire["reply"], "status");
        assert_eq!(wire["started_at_unix"], 7);
    }

    #[test]
    fn error_reply_becomes_protocol_error() {
        let err = unexpected(DaemonReply::Error {
            message: "invalid command".to_string(),
        });
        assert_eq!(err.to_string(), "daemon protocol error: invalid command");
    }
}
