//! Submoduler daemon: one sync worker per resolved repository, a status
//! board, and a Unix-socket control channel.

mod error;
pub mod pool;
pub mod protocol;
mod runtime;
pub mod status;
pub mod worker;

pub use error::DaemonError;
pub use pool::SyncWorkerPool;
pub use protocol::{request_status, request_stop, send_command, DaemonCommand, DaemonReply};
pub use runtime::{run, start_blocking, RunOptions};
pub use status::{RepoStatus, SharedStatus, StatusBoard, StatusSnapshot};
pub use worker::{CycleOutcome, SyncStep, SyncWorker};
