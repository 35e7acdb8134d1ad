//! Integration tests for the `semprov` CLI binary.
//!
//! These cover argument parsing, help output, completions, settings
//! handling and error exit codes, all without a live appliance.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `semprov` binary with env isolation.
///
/// Clears all `SEMPROV_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real settings.
fn semprov_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("semprov");
    cmd.env("HOME", "/tmp/semprov-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/semprov-cli-test-nonexistent")
        .env_remove("SEMPROV_CONFIG")
        .env_remove("SEMPROV_SETTINGS")
        .env_remove("SEMPROV_ENV")
        .env_remove("SEMPROV_OUTPUT")
        .env_remove("SEMPROV_USER_PASSWORD")
        .env_remove("SEMPROV_INFLUXDB_PASS")
        .env_remove("SEMPROV_BRIDGE_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

const SETTINGS: &str = r"
defaults:
  timeout: 5
environments:
  dev:
    endpoints:
      - http://127.0.0.1:1/SEMP
      - http://127.0.0.1:2/SEMP
    username: admin
    password: dev-secret
  empty:
    endpoints: []
    password: nope
";

fn settings_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(SETTINGS.as_bytes()).unwrap();
    file
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
    let output = semprov_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    semprov_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("SEMP")
            .and(predicate::str::contains("provision"))
            .and(predicate::str::contains("queue"))
            .and(predicate::str::contains("bridge")),
    );
}

#[test]
fn test_version_flag() {
    semprov_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("semprov"));
}

#[test]
fn test_short_v_selects_a_vpn() {
    semprov_cmd()
        .args(["queue", "list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-V, --vpn"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    semprov_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    semprov_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Usage errors ────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = semprov_cmd().arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error naming the subcommand:\n{text}");
}

#[test]
fn test_queue_create_requires_queue_names() {
    let output = semprov_cmd()
        .args(["-e", "dev", "queue", "create", "-V", "dev_testvpn"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--queues"));
}

#[test]
fn test_invalid_shutdown_mode() {
    let output = semprov_cmd()
        .args(["queue", "create", "-V", "v", "-Q", "q1", "--shutdown", "sometimes"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("invalid shutdown mode 'sometimes'"));
}

#[test]
fn test_shutdown_accepts_every_spelling() {
    let file = settings_file();
    for mode in ["true", "b", "Both", "q", "user", "off"] {
        let output = semprov_cmd()
            .arg("--settings")
            .arg(file.path())
            .args(["queue", "create", "-V", "v", "-Q", "q1", "--shutdown", mode])
            .output()
            .unwrap();
        // Parsed fine; fails later for want of an environment.
        assert_eq!(output.status.code(), Some(2), "mode {mode}");
        let text = combined_output(&output);
        assert!(text.contains("No environment selected"), "mode {mode}: {text}");
    }
}

#[test]
fn test_invalid_queue_permission() {
    let output = semprov_cmd()
        .args(["queue", "permission", "-V", "v", "-Q", "q1", "--permission", "everything"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--permission"));
}

#[test]
fn test_queue_help_lists_maintenance_commands() {
    semprov_cmd()
        .args(["queue", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("purge"))
        .stdout(predicate::str::contains("permission"));
}

#[test]
fn test_influxdb_options_need_a_host() {
    let output = semprov_cmd()
        .args(["metrics", "--influxdb-user", "grafana"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--influxdb-host"));
}

#[test]
fn test_metrics_help_lists_influxdb_options() {
    semprov_cmd()
        .args(["metrics", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--influxdb-host"))
        .stdout(predicate::str::contains("--set-retention"));
}

#[test]
fn test_invalid_retention_duration() {
    let output = semprov_cmd()
        .args(["metrics", "--retention", "forever"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("not a duration"));
}

#[test]
fn test_missing_environment() {
    let file = settings_file();
    let output = semprov_cmd()
        .arg("--settings")
        .arg(file.path())
        .args(["queue", "list", "-V", "dev_testvpn"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("No environment selected"));
}

#[test]
fn test_unknown_environment() {
    let file = settings_file();
    let output = semprov_cmd()
        .arg("--settings")
        .arg(file.path())
        .args(["-e", "prod", "vpn", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("prod"), "{text}");
    assert!(text.contains("dev"), "Expected configured environments listed:\n{text}");
}

#[test]
fn test_environment_without_endpoints() {
    let file = settings_file();
    let output = semprov_cmd()
        .arg("--settings")
        .arg(file.path())
        .args(["-e", "empty", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("endpoints"));
}

#[test]
fn test_unreachable_appliance_is_a_connection_error() {
    let file = settings_file();
    let output = semprov_cmd()
        .arg("--settings")
        .arg(file.path())
        .args(["-e", "dev", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}

// ── Config commands ─────────────────────────────────────────────────

#[test]
fn test_config_path_reports_explicit_file() {
    let file = settings_file();
    semprov_cmd()
        .args(["config", "path", "--settings"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(file.path().to_str().unwrap()));
}

#[test]
fn test_config_path_missing_file_fails() {
    semprov_cmd()
        .args(["config", "path", "--settings", "/tmp/semprov-cli-test-nonexistent/x.yaml"])
        .assert()
        .failure();
}

#[test]
fn test_config_show_masks_passwords() {
    let file = settings_file();
    semprov_cmd()
        .args(["config", "show", "--settings"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("********").and(predicate::str::contains("dev-secret").not()));
}

#[test]
fn test_config_envs_lists_environments() {
    let file = settings_file();
    semprov_cmd()
        .args(["config", "envs", "-o", "plain", "--settings"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("dev").and(predicate::str::contains("empty")));
}
