//! Integration tests for the `chartdeck` binary.
//!
//! Argument parsing, config handling, and a few commands against a mock
//! chart service. Every test gets its own empty config directory.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Command for the `chartdeck` binary with env isolation.
fn chartdeck_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("chartdeck");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("CHARTDECK_PROFILE")
        .env_remove("CHARTDECK_URL")
        .env_remove("CHARTDECK_OUTPUT")
        .env_remove("CHARTDECK_INSECURE")
        .env_remove("CHARTDECK_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Run a prepared command off the async runtime so the mock server keeps
/// answering.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn ok(body: Value) -> ResponseTemplate {
    let mut envelope = json!({"status": "OK"});
    if let (Some(target), Some(extra)) = (envelope.as_object_mut(), body.as_object()) {
        target.extend(extra.clone());
    }
    ResponseTemplate::new(200).set_body_json(envelope)
}

async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A ready service with one chart set named `osm`.
async fn chart_service() -> MockServer {
    let server = MockServer::start().await;
    mount_get(&server, "/settings/ready", ok(json!({"ready": true}))).await;
    mount_get(
        &server,
        "/status/",
        ok(json!({"data": {
            "chartManager": {
                "state": "READY",
                "numCandidates": 3,
                "numRead": 3,
                "chartSets": [{
                    "info": {"name": "osm", "title": "OpenSeaMap", "version": "4"},
                    "status": "READY",
                    "active": true,
                    "canDelete": true,
                    "numValidCharts": 3,
                    "numCandidates": 3
                }]
            },
            "plugins": {"loadedPlugins": []}
        }})),
    )
    .await;
    server
}

/// A ready service with a small settings catalog.
async fn settings_service() -> MockServer {
    let server = MockServer::start().await;
    mount_get(&server, "/settings/ready", ok(json!({"ready": true}))).await;
    mount_get(
        &server,
        "/settings.json",
        ResponseTemplate::new(200).set_body_json(json!({
            "important": [
                {"name": "scale.min", "title": "Min scale", "type": "int",
                 "min": 1, "max": 20, "default": 5, "group": "Main"},
                {"name": "S52_DEPTH_UNIT_SHOW", "title": "Depth unit", "type": "enum",
                 "values": "0,1,2", "choices": "feet,meters,fathoms", "default": 1,
                 "group": "Display"}
            ],
            "detail": []
        })),
    )
    .await;
    mount_get(
        &server,
        "/settings/get",
        ok(json!({"data": {"scale.min": 5, "S52_DEPTH_UNIT_SHOW": 1}})),
    )
    .await;
    server
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = chartdeck_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    chartdeck_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("status")
            .and(predicate::str::contains("charts"))
            .and(predicate::str::contains("settings")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    chartdeck_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("chartdeck"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    chartdeck_cmd(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chartdeck"));
}

#[test]
fn test_invalid_output_format() {
    let home = TempDir::new().unwrap();
    chartdeck_cmd(&home)
        .args(["-o", "xml", "status"])
        .assert()
        .failure()
        .code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_missing_config_is_config_error() {
    let home = TempDir::new().unwrap();
    chartdeck_cmd(&home)
        .arg("status")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();
    chartdeck_cmd(&home)
        .args(["config", "init", "--url", "http://chartbox:8082/"])
        .assert()
        .success();

    let path = chartdeck_cmd(&home).args(["config", "path"]).output().unwrap();
    let path = String::from_utf8(path.stdout).unwrap();
    assert!(std::path::Path::new(path.trim()).exists(), "missing {path}");

    chartdeck_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.default]")
                .and(predicate::str::contains("http://chartbox:8082/")),
        );
}

#[test]
fn test_config_init_rejects_bad_scheme() {
    let home = TempDir::new().unwrap();
    chartdeck_cmd(&home)
        .args(["config", "init", "--url", "ftp://chartbox/"])
        .assert()
        .code(7);
}

#[test]
fn test_config_init_needs_url_without_terminal() {
    let home = TempDir::new().unwrap();
    chartdeck_cmd(&home)
        .args(["config", "init"])
        .assert()
        .code(5);
}

// ── Against a mock service ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_table() {
    let server = chart_service().await;
    let home = TempDir::new().unwrap();
    let mut cmd = chartdeck_cmd(&home);
    cmd.args(["--url", &server.uri(), "status"]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Chart manager: READY"), "{stdout}");
    assert!(stdout.contains("OpenSeaMap"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_charts_list_json() {
    let server = chart_service().await;
    let home = TempDir::new().unwrap();
    let mut cmd = chartdeck_cmd(&home);
    cmd.args(["--url", &server.uri(), "-o", "json", "charts", "list"]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let sets: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sets.as_array().map(Vec::len), Some(1));
    assert_eq!(sets[0]["info"]["name"], "osm");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_service_is_connection_error() {
    let home = TempDir::new().unwrap();
    let mut cmd = chartdeck_cmd(&home);
    cmd.args(["--url", "http://127.0.0.1:1/", "--timeout", "2", "status"]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_without_yes_is_declined() {
    let server = chart_service().await;
    Mock::given(method("POST"))
        .and(path("/upload/deleteset"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = chartdeck_cmd(&home);
    cmd.args(["--url", &server.uri(), "charts", "delete", "osm"]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("declined"), "{stderr}");
    assert!(stderr.contains("Nothing deleted"), "{stderr}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_chart_set_is_not_found() {
    let server = chart_service().await;
    let home = TempDir::new().unwrap();
    let mut cmd = chartdeck_cmd(&home);
    cmd.args(["--url", &server.uri(), "-y", "charts", "enable", "nautical"]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_settings_show_lists_fields() {
    let server = settings_service().await;
    let home = TempDir::new().unwrap();
    let mut cmd = chartdeck_cmd(&home);
    cmd.args(["--url", &server.uri(), "-o", "plain", "settings", "show"]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("scale.min=5"), "{stdout}");
    assert!(stdout.contains("S52_DEPTH_UNIT_SHOW=1"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_settings_set_rejects_bad_value() {
    let server = settings_service().await;
    let home = TempDir::new().unwrap();
    let mut cmd = chartdeck_cmd(&home);
    cmd.args(["--url", &server.uri(), "settings", "set", "scale.min=big"]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(5), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_settings_set_unknown_field_is_not_found() {
    let server = settings_service().await;
    let home = TempDir::new().unwrap();
    let mut cmd = chartdeck_cmd(&home);
    cmd.args(["--url", &server.uri(), "settings", "set", "nope=1"]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_settings_set_submits_diff() {
    let server = settings_service().await;
    Mock::given(method("POST"))
        .and(path("/settings/set"))
        .respond_with(ok(json!({"hasChanged": false})))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = chartdeck_cmd(&home);
    cmd.args(["--url", &server.uri(), "settings", "set", "scale.min=7"]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("reported no changes"), "{stderr}");
}
