//! Submoduler: keep parent repositories pointing at their submodules' latest commits.
//!
//! # Usage
//!
//! ```text
//! submoduler start [--config-path <file>] [--user <name>] [--email <addr>] [--pat <token>]
//! submoduler status [--repo <name>] [--json]
//! submoduler stop
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{start::StartArgs, status::StatusArgs};

#[derive(Parser, Debug)]
#[command(
    name = "submoduler",
    version,
    about = "Continuously advance git submodule pointers and push the result",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve configured repositories and sync them until stopped.
    Start(StartArgs),

    /// Query a running instance over its control socket.
    Status(StatusArgs),

    /// Ask a running instance to shut down.
    Stop,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Start(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Stop => commands::stop::run(),
    }
}
