//! `submoduler stop`

use anyhow::{Context, Result};

use submoduler_daemon::{request_stop, DaemonError};

pub fn run() -> Result<()> {
    let home = submoduler_core::paths::home()?;
    match request_stop(&home) {
        Ok(()) => println!("stop requested"),
        Err(DaemonError::DaemonNotRunning { .. }) => println!("submoduler is not running"),
        Err(err) => return Err(err).context("failed to stop submoduler"),
    }
    Ok(())
}
