//! Typed configuration model.
//!
//! ```yaml
//! interval: 60
//! repos:
//!   services:
//!     url: https://github.com/acme/services.git
//!     commit_message: "chore({repo}): bump submodules"
//!     to_latest_revision: true
//! organization:
//!   acme:
//!     commit_message: "chore: bump submodules"
//! ```
//!
//! [`Config::load`] parses and validates in one step; nothing downstream ever
//! sees a config that failed [`Config::validate`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Hosting authority the HTTPS credential line is bound to.
pub const DEFAULT_HOST: &str = "github.com";

/// Base URL of the hosting API used for organization expansion.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Root of the submoduler YAML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between sync cycles, shared by every worker.
    pub interval: u64,
    #[serde(default, deserialize_with = "entries_or_default")]
    pub repos: BTreeMap<String, RepoEntry>,
    #[serde(default, deserialize_with = "entries_or_default")]
    pub organization: BTreeMap<String, OrganizationEntry>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

/// An explicitly listed repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default = "default_true")]
    pub to_latest_revision: bool,
}

impl Default for RepoEntry {
    fn default() -> Self {
        Self {
            url: String::new(),
            commit_message: None,
            to_latest_revision: true,
        }
    }
}

/// Defaults applied to every repository discovered under an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationEntry {
    /// Overrides [`Config::api_url`] for this organization (e.g. an enterprise host).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default = "default_true")]
    pub to_latest_revision: bool,
}

impl Default for OrganizationEntry {
    fn default() -> Self {
        Self {
            url: None,
            commit_message: None,
            to_latest_revision: true,
        }
    }
}

impl Config {
    /// Read, parse and validate the config file at `path`.
    ///
    /// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse`
    /// (with path + line context) if malformed, or the first validation error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse and validate YAML `contents`; `origin` is only used for error messages.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(origin),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants every consumer relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.organization.len() > 1 {
            return Err(ConfigError::MultipleOrganizations {
                names: self.organization.keys().cloned().collect(),
            });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// The single configured organization, if any.
    pub fn organization(&self) -> Option<(&str, &OrganizationEntry)> {
        self.organization
            .iter()
            .next()
            .map(|(name, entry)| (name.as_str(), entry))
    }
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Accepts a missing/null map and null entry values (`acme:` with no body).
fn entries_or_default<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let raw = Option::<BTreeMap<String, Option<T>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, entry)| (name, entry.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Config, ConfigError> {
        Config::parse(yaml, Path::new("inline.yaml"))
    }

    #[test]
    fn minimal_repo_config_uses_defaults() {
        let config = parse("interval: 30\nrepos:\n  b:\n    url: https://github.com/acme/b.git\n")
            .expect("parse");
        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        let entry = &config.repos["b"];
        assert!(entry.to_latest_revision);
        assert!(entry.commit_message.is_none());
        assert!(config.organization().is_none());
    }

    #[test]
    fn organization_without_body_gets_defaults() {
        let config = parse("interval: 10\norganization:\n  acme:\n").expect("parse");
        let (name, entry) = config.organization().expect("organization");
        assert_eq!(name, "acme");
        assert_eq!(entry, &OrganizationEntry::default());
    }

    #[test]
    fn two_organizations_rejected_with_all_names() {
        let err = parse("interval: 10\norganization:\n  zeta: {}\n  acme: {}\n").unwrap_err();
        match err {
            ConfigError::MultipleOrganizations { names } => {
                assert_eq!(names, vec!["acme".to_string(), "zeta".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn entry_without_url_is_kept_for_the_resolver_to_skip() {
        let config = parse(
            "interval: 10\nrepos:\n  good:\n    url: https://github.com/acme/good.git\n  bad: {}\n",
        )
        .expect("parse");
        assert_eq!(config.repos.len(), 2);
        assert!(config.repos["bad"].url.is_empty());
    }

    #[test]
    fn empty_config_is_valid() {
        let config = parse("interval: 10\n").expect("parse");
        assert!(config.repos.is_empty());
        assert!(config.organization().is_none());
    }

    #[test]
    fn zero_interval_rejected() {
        let err = parse("interval: 0\norganization:\n  acme: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval));
    }
}
