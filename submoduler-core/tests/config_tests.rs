//! Config load, validation, and error-message tests.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use rstest::rstest;
use submoduler_core::{Config, ConfigError};

fn write_config(dir: &assert_fs::TempDir, yaml: &str) -> std::path::PathBuf {
    let file = dir.child("submoduler.yaml");
    file.write_str(yaml).expect("write config");
    file.path().to_path_buf()
}

// ---------------------------------------------------------------------------
// 1. Load errors
// ---------------------------------------------------------------------------

#[test]
fn load_missing_file_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("absent.yaml");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, ": : corrupt : yaml : !!!\n  - broken: [unclosed");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("submoduler.yaml"));
}

#[test]
fn load_without_interval_is_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, "repos:\n  a:\n    url: https://github.com/acme/a.git\n");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Full config
// ---------------------------------------------------------------------------

#[test]
fn load_full_config() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("submoduler.yaml").assert(predicate::path::missing());
    let path = write_config(
        &dir,
        r#"
interval: 120
host: git.example.com
api_url: https://git.example.com/api/v3
repos:
  services:
    url: https://git.example.com/acme/services.git
    commit_message: "chore({repo}): bump submodules"
  pinned:
    url: git@git.example.com:acme/pinned.git
    to_latest_revision: false
organization:
  acme:
    commit_message: "org bump"
    to_latest_revision: true
"#,
    );
    dir.child("submoduler.yaml").assert(predicate::path::exists());

    let config = Config::load(&path).expect("load");
    assert_eq!(config.interval, 120);
    assert_eq!(config.host, "git.example.com");
    assert_eq!(config.repos.len(), 2);
    assert_eq!(
        config.repos["services"].commit_message.as_deref(),
        Some("chore({repo}): bump submodules")
    );
    assert!(!config.repos["pinned"].to_latest_revision);

    let (org, entry) = config.organization().expect("organization");
    assert_eq!(org, "acme");
    assert_eq!(entry.commit_message.as_deref(), Some("org bump"));
    assert!(entry.url.is_none());
}

// ---------------------------------------------------------------------------
// 3. Validation (fails before anything else happens)
// ---------------------------------------------------------------------------

#[rstest]
#[case("two", "interval: 5\norganization:\n  a: {}\n  b: {}\n", 2)]
#[case("three", "interval: 5\norganization:\n  a:\n  b:\n  c:\n", 3)]
#[case(
    "with_repos",
    "interval: 5\nrepos:\n  x:\n    url: https://github.com/a/x.git\norganization:\n  a: {}\n  b: {}\n",
    2
)]
fn more_than_one_organization_is_fatal(
    #[case] label: &str,
    #[case] yaml: &str,
    #[case] expected: usize,
) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, yaml);
    match Config::load(&path) {
        Err(ConfigError::MultipleOrganizations { names }) => {
            assert_eq!(names.len(), expected, "[{label}] organization names");
        }
        other => panic!("[{label}] expected MultipleOrganizations, got {other:?}"),
    }
}

#[rstest]
#[case("zero_interval", "interval: 0\nrepos:\n  a:\n    url: https://github.com/a/a.git\n")]
#[case("zero_interval_org", "interval: 0\norganization:\n  acme: {}\n")]
#[case("negative_interval", "interval: -5\nrepos:\n  a:\n    url: https://github.com/a/a.git\n")]
fn invalid_intervals_rejected(#[case] label: &str, #[case] yaml: &str) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, yaml);
    let err = Config::load(&path).unwrap_err();
    let expected = match label {
        "negative_interval" => matches!(err, ConfigError::Parse { .. }),
        _ => matches!(err, ConfigError::InvalidInterval),
    };
    assert!(expected, "[{label}] unexpected error: {err}");
}

#[rstest]
#[case("empty_url", "interval: 5\nrepos:\n  a:\n    url: \"\"\n  b:\n    url: https://github.com/a/b.git\n", 2)]
#[case("missing_url", "interval: 5\nrepos:\n  a: {}\n  b:\n    url: https://github.com/a/b.git\n", 2)]
#[case("nothing", "interval: 5\n", 0)]
#[case("empty_sections", "interval: 5\nrepos:\norganization:\n", 0)]
fn incomplete_entries_load_without_error(
    #[case] label: &str,
    #[case] yaml: &str,
    #[case] repos: usize,
) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, yaml);
    let config = Config::load(&path).unwrap_or_else(|err| panic!("[{label}] {err}"));
    assert_eq!(config.repos.len(), repos, "[{label}] repo entries");
}
