//! End-to-end CLI tests for the outcall binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Command with an isolated config home so a developer's config never leaks in.
fn outcall(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("outcall").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    outcall(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("coordinated call"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    outcall(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("outcall"));
}

#[test]
fn test_binary_without_url_fails() {
    let home = TempDir::new().unwrap();
    outcall(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

#[test]
fn test_binary_invalid_cert_override_fails() {
    let home = TempDir::new().unwrap();
    outcall(&home)
        .args(["--cert", "no-separator", "https://127.0.0.1:9/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected host=path"));
}

#[test]
fn test_binary_bad_config_file_fails() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("outcall");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "concurrency = 5\n").unwrap();

    outcall(&home)
        .arg("http://127.0.0.1:9/")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[tokio::test]
async fn test_binary_prints_body_and_archives() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"pong":true}"#))
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let archive = home.path().join("raw.log");
    let throttle_dir = home.path().join("throttle");
    let url = format!("{}/v1/ping", mock_server.uri());
    let config_dir = home.path().join("outcall");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!("throttle_dir = \"{}\"\n", throttle_dir.display()),
    )
    .unwrap();

    let mut cmd = outcall(&home);
    cmd.args(["--json", "--throttle-ms", "10", "--archive"])
        .arg(&archive)
        .arg(&url);
    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert
        .success()
        .stdout(predicate::str::contains("\"pong\": true"));

    let archived = std::fs::read_to_string(&archive).unwrap();
    assert_eq!(archived, format!("GET {url}\n{{\"pong\":true}}\n"));
}

#[tokio::test]
async fn test_binary_not_ok_exits_with_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = outcall(&home);
    cmd.arg(mock_server.uri());
    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert.failure().stdout(predicate::str::contains("forbidden"));
}
