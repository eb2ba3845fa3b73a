//! Integration tests for the `apled` CLI binary.
//!
//! Argument parsing, help output, completions, local schedule management,
//! and error handling. Controller-bound commands run against a wiremock
//! controller; nothing touches the user's real config or keyring.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `apled` binary with env isolation.
///
/// Config file and state directory live inside `home`; all `APLED_*`
/// variables are cleared and the keyring's session bus is unreachable.
fn apled_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("apled");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("APLED_CONFIG", home.path().join("config.toml"))
        .env("APLED_DATA_DIR", home.path().join("state"))
        .env("DBUS_SESSION_BUS_ADDRESS", "unix:path=/nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("APLED_CONTROLLER")
        .env_remove("APLED_SITE")
        .env_remove("APLED_USERNAME")
        .env_remove("APLED_OUTPUT")
        .env_remove("APLED_INSECURE")
        .env_remove("APLED_PASSWORD");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

/// `apled schedules add <name>` and return the new schedule id.
fn add_schedule(home: &TempDir, name: &str, extra: &[&str]) -> String {
    let output = apled_cmd(home)
        .args(["schedules", "add", name, "-o", "json"])
        .args(extra)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    stdout_json(&output)["id"].as_str().unwrap().to_owned()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = apled_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("access-point LEDs")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("led"))
            .and(predicate::str::contains("schedules"))
            .and(predicate::str::contains("run")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("apled"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("apled"));
}

#[test]
fn test_unknown_output_format_is_usage_error() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .args(["schedules", "list", "-o", "xml"])
        .assert()
        .code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_env_override() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("config.toml").and(predicate::str::contains("state")),
        );
}

#[test]
fn test_config_init_writes_file_and_refuses_overwrite() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .args([
            "config", "init", "--url", "192.168.1.1", "--username", "admin", "--insecure",
        ])
        .assert()
        .success();

    let written = std::fs::read_to_string(home.path().join("config.toml")).unwrap();
    assert!(written.contains("url = \"192.168.1.1\""), "{written}");
    assert!(written.contains("username = \"admin\""), "{written}");
    assert!(written.contains("site = \"default\""), "{written}");
    assert!(written.contains("insecure = true"), "{written}");
    assert!(!written.contains("password"), "{written}");

    apled_cmd(&home)
        .args(["config", "init", "--url", "10.0.0.1", "--username", "ops"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_config_init_without_url_fails_non_interactively() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .args(["config", "init", "--username", "admin"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--url"));
}

#[test]
fn test_config_show_json_reports_password_source() {
    let home = TempDir::new().unwrap();
    let output = apled_cmd(&home)
        .env("APLED_PASSWORD", "pw")
        .args(["config", "show", "-o", "json", "--controller", "unifi.local"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let view = stdout_json(&output);
    assert_eq!(view["controller"]["url"], "unifi.local");
    assert_eq!(view["controller"]["site"], "default");
    assert_eq!(view["daemon"]["refresh_interval_secs"], 300);
    assert_eq!(view["password"], "environment (APLED_PASSWORD)");
}

// ── Schedules (no controller needed) ────────────────────────────────

#[test]
fn test_schedules_list_starts_empty() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .args(["schedules", "list", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_schedule_add_rule_and_next() {
    let home = TempDir::new().unwrap();
    let id = add_schedule(&home, "Office", &["--device", "AA-BB-CC-00-00-01"]);

    apled_cmd(&home)
        .args([
            "schedules", "add-rule", "Office", "--day", "Monday", "--on", "07:00", "--off",
            "19:30",
        ])
        .assert()
        .success();

    let output = apled_cmd(&home)
        .args(["schedules", "show", &id[..8], "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let schedule = stdout_json(&output);
    assert_eq!(schedule["name"], "Office");
    assert_eq!(schedule["enabled"], true);
    assert_eq!(schedule["assignments"], json!(["aa:bb:cc:00:00:01"]));
    assert_eq!(schedule["rules"][0]["day"], "monday");
    assert_eq!(schedule["rules"][0]["on_time"], 7 * 3600);
    assert_eq!(schedule["rules"][0]["off_time"], 19 * 3600 + 30 * 60);

    let output = apled_cmd(&home)
        .args(["schedules", "next", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let timers = stdout_json(&output);
    let timers = timers.as_array().unwrap();
    assert_eq!(timers.len(), 2);
    assert!(timers.iter().all(|t| t["schedule_id"] == id.as_str()));
}

#[test]
fn test_disabled_schedule_arms_nothing() {
    let home = TempDir::new().unwrap();
    add_schedule(&home, "Night", &[]);
    apled_cmd(&home)
        .args([
            "schedules", "add-rule", "night", "--day", "friday", "--on", "22:00", "--off", "22:00",
        ])
        .assert()
        .success();
    apled_cmd(&home)
        .args(["schedules", "disable", "Night"])
        .assert()
        .success();

    apled_cmd(&home)
        .args(["schedules", "next", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_schedule_remove_requires_yes_without_tty() {
    let home = TempDir::new().unwrap();
    let id = add_schedule(&home, "Temp", &[]);

    apled_cmd(&home)
        .args(["schedules", "remove", &id])
        .write_stdin("")
        .assert()
        .code(2);

    apled_cmd(&home)
        .args(["schedules", "remove", &id, "--yes"])
        .assert()
        .success();
    apled_cmd(&home)
        .args(["schedules", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()).not());
}

#[test]
fn test_unknown_schedule_is_not_found() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .args(["schedules", "show", "nope"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("schedules list"));
}

#[test]
fn test_add_rule_rejects_bad_day_and_time() {
    let home = TempDir::new().unwrap();
    add_schedule(&home, "Office", &[]);
    apled_cmd(&home)
        .args([
            "schedules", "add-rule", "Office", "--day", "someday", "--on", "07:00", "--off", "08:00",
        ])
        .assert()
        .code(2);
    apled_cmd(&home)
        .args([
            "schedules", "add-rule", "Office", "--day", "monday", "--on", "25:00", "--off", "08:00",
        ])
        .assert()
        .code(2);
}

// ── Controller-bound commands ───────────────────────────────────────

#[test]
fn test_devices_without_controller_is_usage_error() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .args(["devices", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No controller configured"));
}

#[test]
fn test_devices_without_password_is_auth_error() {
    let home = TempDir::new().unwrap();
    apled_cmd(&home)
        .args(["devices", "list", "--controller", "127.0.0.1:9", "--username", "admin"])
        .assert()
        .code(3);
}

fn login_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .append_header("set-cookie", "TOKEN=abc; Path=/; HttpOnly")
        .insert_header("x-csrf-token", "csrf-1")
        .set_body_json(json!({}))
}

async fn mock_controller() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/proxy/network/api/auth/login"))
        .respond_with(login_ok())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy/network/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "_id": "ap1", "mac": "aa:bb:cc:00:00:01", "type": "uap",
                    "name": "Hallway", "ip": "10.0.0.11", "model": "U6-Lite",
                    "led_enabled": true, "state": 1
                },
                {
                    "_id": "sw1", "mac": "aa:bb:cc:00:00:02", "type": "usw",
                    "name": "Core", "model": "ES-24-250W", "state": 1
                }
            ]
        })))
        .mount(&server)
        .await;
    server
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_blocking(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_against_mock_controller() {
    let server = mock_controller().await;
    let home = TempDir::new().unwrap();

    let mut cmd = apled_cmd(&home);
    cmd.env("APLED_PASSWORD", "pw").args([
        "devices",
        "list",
        "-o",
        "json",
        "--controller",
        &server.uri(),
        "--username",
        "admin",
    ]);
    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let devices = stdout_json(&output);
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["device_id"], "ap1");
    assert_eq!(devices[0]["name"], "Hallway");
    assert_eq!(devices[0]["led_enabled"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_led_off_for_one_device() {
    let server = mock_controller().await;
    Mock::given(method("PUT"))
        .and(path("/proxy/network/api/s/default/rest/device/ap1"))
        .and(body_json(json!({ "led_override": "off" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    let mut cmd = apled_cmd(&home);
    cmd.env("APLED_PASSWORD", "pw").args([
        "led",
        "off",
        "--device",
        "AA:BB:CC:00:00:01",
        "--controller",
        &server.uri(),
        "--username",
        "admin",
    ]);
    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Hallway"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_led_on_unknown_device_is_not_found() {
    let server = mock_controller().await;
    let home = TempDir::new().unwrap();

    let mut cmd = apled_cmd(&home);
    cmd.env("APLED_PASSWORD", "pw").args([
        "led",
        "on",
        "--device",
        "ff:ff:ff:ff:ff:ff",
        "--controller",
        &server.uri(),
        "--username",
        "admin",
    ]);
    let output = run_blocking(cmd).await;
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}
