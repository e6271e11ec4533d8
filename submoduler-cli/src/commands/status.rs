//! `submoduler status`: per-repository sync state from a running instance.

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use submoduler_core::paths::socket_path;
use submoduler_daemon::{request_status, DaemonError, RepoStatus, StatusSnapshot};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show this repository (`<org>/<repo>` for organization members).
    #[arg(long)]
    pub repo: Option<String>,

    /// Emit the raw JSON payload.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "REPO")]
    repo: String,
    #[tabled(rename = "LAST")]
    last: String,
    #[tabled(rename = "CYCLES")]
    cycles: u64,
    #[tabled(rename = "UPDATES")]
    updates: u64,
    #[tabled(rename = "FAILURES")]
    failures: u64,
    #[tabled(rename = "LAST CYCLE")]
    last_cycle: String,
    #[tabled(rename = "ERROR")]
    error: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = submoduler_core::paths::home()?;

        let snapshot = match request_status(&home, self.repo.clone()) {
            Ok(snapshot) => snapshot,
            Err(DaemonError::DaemonNotRunning { .. }) => {
                if self.json {
                    let payload = serde_json::json!({
                        "running": false,
                        "socket": socket_path(&home).display().to_string(),
                    });
                    print_json(&payload)?;
                } else {
                    println!("submoduler is not running");
                }
                return Ok(());
            }
            Err(err) => return Err(err).context("failed to query submoduler status"),
        };

        if self.json {
            return print_json(&snapshot);
        }

        let rows = rows(&snapshot);
        if rows.is_empty() {
            match self.repo {
                Some(name) => println!("no repository named '{name}'"),
                None => println!("no repositories are being synced"),
            }
            return Ok(());
        }
        println!("{}", Table::new(rows).with(Style::sharp()));
        Ok(())
    }
}

fn print_json(payload: &impl Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).context("failed to render status JSON")?
    );
    Ok(())
}

fn rows(snapshot: &StatusSnapshot) -> Vec<StatusRow> {
    snapshot.repos.iter().map(row).collect()
}

fn row(repo: &RepoStatus) -> StatusRow {
    StatusRow {
        repo: repo.name.clone(),
        last: colorize_outcome(repo.last_outcome.as_deref().unwrap_or("")),
        cycles: repo.cycles,
        updates: repo.updates,
        failures: repo.failures,
        last_cycle: format_unix(repo.last_cycle_at_unix),
        error: repo.last_error.clone().unwrap_or_default(),
    }
}

fn colorize_outcome(label: &str) -> String {
    match label {
        "updated" => label.green().to_string(),
        "up_to_date" => label.normal().to_string(),
        "failed" | "crashed" => label.red().to_string(),
        "" => "pending".dimmed().to_string(),
        other => other.to_string(),
    }
}

fn format_unix(seconds: u64) -> String {
    if seconds == 0 {
        return "-".to_string();
    }
    i64::try_from(seconds)
        .ok()
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
