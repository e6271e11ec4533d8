//! `submoduler start`: run the sync engine in the foreground.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use submoduler_daemon::{start_blocking, RunOptions};

pub const DEFAULT_CONFIG_PATH: &str = "/opt/submoduler.yaml";

#[derive(Args, Debug)]
pub struct StartArgs {
    /// YAML config listing repositories and/or one organization.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config_path: PathBuf,

    /// Account used for HTTPS auth and commit authorship.
    #[arg(long, env = "USER")]
    pub user: Option<String>,

    /// Commit author email.
    #[arg(long, env = "EMAIL")]
    pub email: Option<String>,

    /// Personal access token for the git host.
    #[arg(long, env = "PAT", hide_env_values = true)]
    pub pat: Option<String>,
}

impl StartArgs {
    pub fn run(self) -> Result<()> {
        let home = submoduler_core::paths::home()?;
        let config_path = if self.config_path.is_absolute() {
            self.config_path
        } else {
            std::env::current_dir()
                .context("could not determine working directory")?
                .join(self.config_path)
        };

        let mut options = RunOptions::new(home, config_path);
        options.username = self.user;
        options.email = self.email;
        options.token = self.pat;

        start_blocking(options).context("submoduler exited with error")
    }
}
