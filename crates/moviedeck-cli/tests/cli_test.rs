#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

use std::net::TcpListener;
use std::path::Path;

use assert_cmd::cargo_bin_cmd;
use predicates::prelude::{PredicateBooleanExt, predicate};

/// Returns a local base URL with nothing listening on it.
fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/3")
}

/// Writes a config with a single fast attempt against `base_url`.
fn write_config(dir: &Path, base_url: &str, api_token: Option<&str>) {
    let token_line = api_token
        .map(|t| format!("api_token = \"{t}\"\n"))
        .unwrap_or_default();
    let content = format!(
        "[tmdb]\nbase_url = \"{base_url}\"\n{token_line}\n[retry]\nmax_retries = 1\ninitial_delay_ms = 10\n"
    );
    std::fs::write(dir.join("config.toml"), content).unwrap();
}

fn moviedeck() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("moviedeck");
    cmd.env_remove("TMDB_API_TOKEN")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    // Arrange & Act & Assert
    moviedeck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("genres"))
        .stdout(predicate::str::contains("top-rated"))
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("details"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("home"));
}

#[test]
fn test_discover_help() {
    // Arrange & Act & Assert
    moviedeck()
        .args(["discover", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--genre-id"))
        .stdout(predicate::str::contains("--page"));
}

#[test]
fn test_details_missing_id() {
    // Arrange & Act & Assert
    moviedeck()
        .arg("details")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--id"));
}

#[test]
fn test_details_rejects_zero_id() {
    // Arrange & Act & Assert
    moviedeck()
        .args(["details", "--id", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid movie ID provided."));
}

#[test]
fn test_details_rejects_negative_id() {
    // Arrange & Act & Assert
    moviedeck()
        .args(["details", "--id", "-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid movie ID provided."));
}

#[test]
fn test_search_rejects_blank_query() {
    // Arrange & Act & Assert
    moviedeck()
        .args(["search", "--query", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Search query cannot be empty."));
}

#[test]
fn test_genres_upstream_failure_shows_generic_message() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), &unreachable_base_url(), Some("test-token"));

    // Act & Assert
    moviedeck()
        .args(["genres", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "An error occurred while fetching genres.",
        ))
        .stderr(predicate::str::contains("127.0.0.1").not());
}

#[test]
fn test_missing_token_fails_with_generic_message() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), &unreachable_base_url(), None);

    // Act & Assert
    moviedeck()
        .args(["search", "--query", "Inception", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "An error occurred while searching for movies.",
        ));
}

#[test]
fn test_home_renders_each_section_despite_failures() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), &unreachable_base_url(), Some("test-token"));

    // Act & Assert
    moviedeck()
        .args(["home", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "An error occurred while fetching the top-rated movie.",
        ))
        .stdout(predicate::str::contains(
            "An error occurred while fetching genres.",
        ));
}

#[test]
fn test_config_init_creates_file() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();

    // Act
    moviedeck()
        .args(["config", "init", "--dir"])
        .arg(dir.path())
        .assert()
        .success();

    // Assert
    let content = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(content.contains("[tmdb]"));
    assert!(content.contains("[retry]"));
    assert!(content.contains("[cache]"));
}

#[test]
fn test_config_init_refuses_overwrite_without_force() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "https://example.com/3", Some("keep-me"));

    // Act & Assert
    moviedeck()
        .args(["config", "init", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    moviedeck()
        .args(["config", "init", "--force", "--dir"])
        .arg(dir.path())
        .assert()
        .success();
    let content = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(!content.contains("keep-me"));
}

#[test]
fn test_config_show_redacts_token() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "https://example.com/3", Some("super-secret"));

    // Act & Assert
    moviedeck()
        .args(["config", "show", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("<redacted>"))
        .stdout(predicate::str::contains("https://example.com/3"))
        .stdout(predicate::str::contains("super-secret").not());
}
