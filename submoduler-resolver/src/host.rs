//! Organization listing on the remote hosting API.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use submoduler_git::CredentialContext;

use crate::error::ResolveError;

/// The two fields resolution consumes from each listed repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteRepo {
    pub name: String,
    pub clone_url: String,
}

/// Read-only access to a hosting provider's repository listing.
pub trait RepositoryHost: Send + Sync {
    fn list_organization_repos(
        &self,
        api_base: &str,
        org: &str,
        ctx: &CredentialContext,
    ) -> Result<Vec<RemoteRepo>, ResolveError>;
}

/// GitHub REST API (`GET /orgs/{org}/repos`), HTTP Basic auth with username + token.
pub struct GitHubHost {
    agent: ureq::Agent,
    page_size: usize,
}

impl Default for GitHubHost {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl GitHubHost {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            page_size: 100,
        }
    }

    fn page_url(&self, api_base: &str, org: &str, page: usize) -> String {
        format!(
            "{}/orgs/{org}/repos?per_page={}&page={page}",
            api_base.trim_end_matches('/'),
            self.page_size
        )
    }
}

impl RepositoryHost for GitHubHost {
    fn list_organization_repos(
        &self,
        api_base: &str,
        org: &str,
        ctx: &CredentialContext,
    ) -> Result<Vec<RemoteRepo>, ResolveError> {
        let creds = ctx.credentials();
        let auth = format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", creds.username(), creds.token()))
        );
        let api_err = |message: String| ResolveError::HostApi {
            org: org.to_string(),
            message,
        };

        let mut repos = Vec::new();
        for page in 1.. {
            let url = self.page_url(api_base, org, page);
            tracing::debug!(%url, "listing organization repositories");
            let response = self
                .agent
                .get(&url)
                .set("Authorization", &auth)
                .set("Accept", "application/vnd.github+json")
                .set("User-Agent", "submoduler")
                .call()
                .map_err(|err| match err {
                    ureq::Error::Status(code, response) => {
                        api_err(format!("HTTP {code} {}", response.status_text()))
                    }
                    ureq::Error::Transport(transport) => api_err(transport.to_string()),
                })?;
            let batch: Vec<RemoteRepo> = response
                .into_json()
                .map_err(|err| api_err(format!("invalid response body: {err}")))?;

            let last_page = batch.len() < self.page_size;
            repos.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_trims_trailing_slash() {
        let host = GitHubHost::default();
        assert_eq!(
            host.page_url("https://api.github.com/", "acme", 2),
            "https://api.github.com/orgs/acme/repos?per_page=100&page=2"
        );
    }

    #[test]
    fn listing_decodes_name_and_clone_url_only() {
        let body = r#"[
            {"id": 1, "name": "api", "clone_url": "https://github.com/acme/api.git", "private": true},
            {"id": 2, "name": "web", "clone_url": "https://github.com/acme/web.git"}
        ]"#;
        let repos: Vec<RemoteRepo> = serde_json::from_str(body).expect("decode");
        assert_eq!(
            repos,
            vec![
                RemoteRepo {
                    name: "api".to_string(),
                    clone_url: "https://github.com/acme/api.git".to_string(),
                },
                RemoteRepo {
                    name: "web".to_string(),
                    clone_url: "https://github.com/acme/web.git".to_string(),
                },
            ]
        );
    }
}
