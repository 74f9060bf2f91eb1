//! CLI integration tests for forgectl
//!
//! These tests run the real binary end to end: exit codes and usage
//! errors, config-file resolution, and full commands against a mocked
//! Forge instance.

use std::fs;
use std::path::PathBuf;

use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command instance for the forgectl binary
fn forgectl_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("forgectl"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Write a bearer-token credentials file into `dir`
fn credentials_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("credentials.yaml");
    fs::write(&path, "token: test-token\n").unwrap();
    path
}

fn group_json(id: u64, full_path: &str) -> serde_json::Value {
    json!({"id": id, "name": full_path.rsplit('/').next().unwrap(), "fullPath": full_path})
}

fn project_json(id: u64, full_path: &str) -> serde_json::Value {
    json!({
        "id": id,
        "path": full_path.rsplit('/').next().unwrap(),
        "fullPath": full_path,
    })
}

fn page(items: Vec<serde_json::Value>) -> serde_json::Value {
    json!({"items": items})
}

/// Mount the mocks for one group `g1` holding projects `g1/a` and `g1/b`
async fn mount_group_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/groups"))
        .and(query_param("search", "g1"))
        .and(bearer_token("test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![group_json(10, "g1")])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups/10/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            project_json(1, "g1/a"),
            project_json(2, "g1/b"),
        ])))
        .mount(server)
        .await;
}

// =============================================================================
// Usage and Exit Code Tests
// =============================================================================

#[test]
fn version_flag_prints_the_version() {
    forgectl_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("forgectl "));
}

#[test]
fn bare_invocation_prints_usage_and_exits_two() {
    forgectl_cmd()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Commands:"))
        .stderr(predicate::str::contains("projects"))
        .stderr(predicate::str::contains("users"));
}

#[test]
fn root_help_exits_cleanly() {
    forgectl_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("administration utility"))
        .stdout(predicate::str::contains("projects"));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let creds = credentials_file(&dir);

    forgectl_cmd()
        .args(["--credentials", creds.to_str().unwrap(), "bogus"])
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown subcommand \"bogus\""))
        .stderr(predicate::str::contains("projects, users"));
}

#[test]
fn parent_without_subcommand_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let creds = credentials_file(&dir);

    forgectl_cmd()
        .args(["--credentials", creds.to_str().unwrap(), "projects"])
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing subcommand"))
        .stderr(predicate::str::contains("create-random"));
}

#[test]
fn leaf_validation_failure_names_the_command() {
    let dir = TempDir::new().unwrap();
    let creds = credentials_file(&dir);

    forgectl_cmd()
        .args(["--credentials", creds.to_str().unwrap(), "projects", "list"])
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid arguments for \"projects list\""))
        .stderr(predicate::str::contains("--group must be set"));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn show_config_without_a_command_prints_defaults() {
    let dir = TempDir::new().unwrap();

    forgectl_cmd()
        .arg("--show-config")
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("base-url: https://forge.example.com"))
        .stdout(predicate::str::contains("global:"));
}

#[test]
fn show_config_reflects_file_and_cli_layers() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(
        &config,
        "global:\n  base-url: https://file.example\nprojects:\n  list:\n    recursive: true\n",
    )
    .unwrap();

    forgectl_cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "--base-url",
            "https://cli.example",
            "--show-config",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("base-url: https://cli.example"))
        .stdout(predicate::str::contains("recursive: true"));
}

#[test]
fn explicit_missing_config_is_fatal() {
    forgectl_cmd()
        .args(["--config", "/nonexistent/forgectl.yaml", "--show-config"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unable to read config file"));
}

#[test]
fn missing_credentials_file_is_fatal() {
    let dir = TempDir::new().unwrap();

    forgectl_cmd()
        .args([
            "--credentials",
            "/nonexistent/creds.yaml",
            "projects",
            "list",
            "--group",
            "g1",
        ])
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unable to read credentials file"));
}

// =============================================================================
// End-to-End Tests Against a Mocked Forge
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn lists_projects_end_to_end() {
    let server = MockServer::start().await;
    mount_group_listing(&server).await;
    let dir = TempDir::new().unwrap();
    let creds = credentials_file(&dir);

    forgectl_cmd()
        .args([
            "--credentials",
            creds.to_str().unwrap(),
            "--base-url",
            &server.uri(),
            "projects",
            "list",
            "--group",
            "g1",
        ])
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1: g1/a"))
        .stdout(predicate::str::contains("2: g1/b"));
}

#[tokio::test(flavor = "multi_thread")]
async fn config_file_supplies_leaf_defaults() {
    let server = MockServer::start().await;
    mount_group_listing(&server).await;
    let dir = TempDir::new().unwrap();
    let creds = credentials_file(&dir);
    let config = dir.path().join("config.yaml");
    fs::write(
        &config,
        format!(
            "global:\n  base-url: {}\nprojects:\n  list:\n    group: g1\n",
            server.uri()
        ),
    )
    .unwrap();

    forgectl_cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "--credentials",
            creds.to_str().unwrap(),
            "projects",
            "list",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1: g1/a"));
}

#[tokio::test(flavor = "multi_thread")]
async fn show_config_with_a_command_prints_then_runs() {
    let server = MockServer::start().await;
    mount_group_listing(&server).await;
    let dir = TempDir::new().unwrap();
    let creds = credentials_file(&dir);

    forgectl_cmd()
        .args([
            "--credentials",
            creds.to_str().unwrap(),
            "--base-url",
            &server.uri(),
            "--show-config",
            "projects",
            "list",
            "--group",
            "g1",
        ])
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("global:"))
        .stdout(predicate::str::contains("group: g1"))
        .stdout(predicate::str::contains("1: g1/a"));
}

#[tokio::test(flavor = "multi_thread")]
async fn dry_run_creates_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups"))
        .and(query_param("search", "g1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![group_json(10, "g1")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_json(1, "g1/x")))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let creds = credentials_file(&dir);

    forgectl_cmd()
        .args([
            "--credentials",
            creds.to_str().unwrap(),
            "--base-url",
            &server.uri(),
            "projects",
            "create-random",
            "--group",
            "g1",
            "--base-name",
            "tmp",
            "--count",
            "2",
            "--dry-run",
        ])
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("- tmp-"))
        .stdout(predicate::str::contains("skipped (dry-run)"));

    server.verify().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn users_list_writes_a_roster_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(query_param("search", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![json!({
            "id": 7,
            "username": "alice",
            "name": "Alice",
            "email": "alice@example.com",
        })])))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let creds = credentials_file(&dir);
    let roster = dir.path().join("roster.yaml");

    forgectl_cmd()
        .args([
            "--credentials",
            creds.to_str().unwrap(),
            "--base-url",
            &server.uri(),
            "users",
            "list",
            "--users",
            "alice",
            "--out",
            roster.to_str().unwrap(),
        ])
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("7: alice (Alice, alice@example.com)"));

    let written = fs::read_to_string(&roster).unwrap();
    assert!(written.contains("username: alice"));
}
