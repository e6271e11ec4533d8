//! Remote URL recognition. Descriptors with an unrecognized URL are skipped.

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlScheme {
    Https,
    Http,
    Ssh,
    Git,
    File,
    /// `user@host:path`
    ScpLike,
    /// An absolute path to a repository on this machine.
    LocalPath,
}

impl UrlScheme {
    pub fn recognize(url: &str) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() || url.chars().any(char::is_whitespace) {
            return None;
        }

        if let Some((scheme, rest)) = url.split_once("://") {
            if rest.is_empty() {
                return None;
            }
            return match scheme.to_ascii_lowercase().as_str() {
                "https" => Some(UrlScheme::Https),
                "http" => Some(UrlScheme::Http),
                "ssh" | "git+ssh" => Some(UrlScheme::Ssh),
                "git" => Some(UrlScheme::Git),
                "file" => Some(UrlScheme::File),
                _ => None,
            };
        }

        if Path::new(url).is_absolute() {
            return Some(UrlScheme::LocalPath);
        }

        let (authority, path) = url.split_once(':')?;
        let (user, host) = authority.split_once('@')?;
        if user.is_empty() || host.is_empty() || path.is_empty() || host.contains('/') {
            return None;
        }
        Some(UrlScheme::ScpLike)
    }
}

impl fmt::Display for UrlScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UrlScheme::Https => "https",
            UrlScheme::Http => "http",
            UrlScheme::Ssh => "ssh",
            UrlScheme::Git => "git",
            UrlScheme::File => "file",
            UrlScheme::ScpLike => "scp",
            UrlScheme::LocalPath => "local",
        };
        f.write_str(label)
    }
}
