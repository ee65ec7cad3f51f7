//! Integration tests for the `backoffice` CLI binary.
//!
//! Argument parsing, help, completions and error exit codes run without a
//! server; the list/delete flows run against a wiremock API.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `backoffice` binary with env isolation.
///
/// Clears all `BACKOFFICE_*` env vars and points the config and data
/// directories at `home` so tests never touch the user's real files.
fn backoffice_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("backoffice");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("BACKOFFICE_PROFILE")
        .env_remove("BACKOFFICE_BASE_URL")
        .env_remove("BACKOFFICE_LANG")
        .env_remove("BACKOFFICE_OUTPUT")
        .env_remove("BACKOFFICE_INSECURE")
        .env_remove("BACKOFFICE_TIMEOUT")
        .env_remove("BACKOFFICE_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Write a signed-in session for the default profile.
fn seed_session(home: &Path) {
    let dir = home.join("data").join("backoffice").join("sessions");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("default.json"),
        json!({"backoffice.session": {"token": "tok-cli", "user": {"name": "Rana"}}}).to_string(),
    )
    .unwrap();
}

fn vendors_page(ids: std::ops::RangeInclusive<u64>, current: u32, last: u32, total: u64) -> Value {
    let items: Vec<Value> = ids
        .map(|id| json!({"id": id, "name": format!("Vendor {id}"), "is_active": true}))
        .collect();
    json!({
        "data": items,
        "meta": {"current_page": current, "last_page": last, "per_page": 15, "total": total},
    })
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = backoffice_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    backoffice_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("list")
            .and(predicate::str::contains("journal"))
            .and(predicate::str::contains("tree"))
            .and(predicate::str::contains("links")),
    );
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    backoffice_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backoffice"));
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    backoffice_cmd(home.path())
        .args(["--output", "xml", "resources"])
        .assert()
        .code(2);
}

#[test]
fn test_resources_catalog_needs_no_server() {
    let home = tempfile::tempdir().unwrap();
    backoffice_cmd(home.path())
        .args(["resources", "--output", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("journal-entries")
                .and(predicate::str::contains("cost-centers"))
                .and(predicate::str::contains("attendance")),
        );
}

// ── Errors and exit codes ───────────────────────────────────────────

#[test]
fn test_list_without_config_is_a_config_error() {
    let home = tempfile::tempdir().unwrap();
    backoffice_cmd(home.path())
        .args(["list", "vendors"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_list_without_session_exits_with_auth_code() {
    let home = tempfile::tempdir().unwrap();
    backoffice_cmd(home.path())
        .args(["--base-url", "http://127.0.0.1:9/api", "list", "vendors"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("backoffice login"));
}

#[test]
fn test_unknown_resource_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    backoffice_cmd(home.path())
        .args(["--base-url", "http://127.0.0.1:9/api", "list", "widgets"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("backoffice resources"));
}

#[test]
fn test_delete_without_terminal_requires_yes() {
    let home = tempfile::tempdir().unwrap();
    backoffice_cmd(home.path())
        .args(["--base-url", "http://127.0.0.1:9/api", "delete", "vendors", "3"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_config_set_then_show() {
    let home = tempfile::tempdir().unwrap();
    backoffice_cmd(home.path())
        .args(["config", "set", "base_url", "https://erp.example/api"])
        .assert()
        .success();
    backoffice_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url = \"https://erp.example/api\""));
}

// ── Against a server ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_prints_rows_and_page_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/vendors"))
        .and(query_param("page", "7"))
        .and(header("authorization", "Bearer tok-cli"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vendors_page(91..=105, 7, 20, 295)))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    seed_session(home.path());
    let base_url = format!("{}/api", server.uri());

    backoffice_cmd(home.path())
        .args(["--base-url", &base_url, "list", "vendors", "--page", "7"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Vendor 91")
                .and(predicate::str::contains("Page 7 of 20"))
                .and(predicate::str::contains("1 … 5 6 [7] 8 9 … 20")),
        );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_json_is_the_raw_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/vendors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vendors_page(1..=2, 1, 1, 2)))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    seed_session(home.path());
    let base_url = format!("{}/api", server.uri());

    let output = backoffice_cmd(home.path())
        .args(["--base-url", &base_url, "-o", "json", "list", "vendors"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[1]["name"], "Vendor 2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deleting_last_row_reports_previous_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/vendors"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vendors_page(31..=31, 3, 3, 31)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/vendors/31"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendors"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vendors_page(16..=30, 2, 2, 30)))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    seed_session(home.path());
    let base_url = format!("{}/api", server.uri());

    backoffice_cmd(home.path())
        .args(["--base-url", &base_url, "-y", "delete", "vendors", "31", "--page", "3"])
        .assert()
        .success()
        .stderr(predicate::str::contains("showing page 2"))
        .stdout(predicate::str::contains("Vendor 30").and(predicate::str::contains("Page 2 of 2")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejected_token_exits_with_auth_code_and_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})),
        )
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    seed_session(home.path());
    let base_url = format!("{}/api", server.uri());

    backoffice_cmd(home.path())
        .args(["--base-url", &base_url, "whoami"])
        .assert()
        .code(3);
    let session_file = home
        .path()
        .join("data")
        .join("backoffice")
        .join("sessions")
        .join("default.json");
    assert!(!session_file.exists());
}
