//! Integration tests for `clonekeeper config`.
//!
//! Every test points `CLONEKEEPER_CONFIG` (or `--config`) at a temp path so
//! the real `~/.clonekeeper/config.yaml` is never read.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn clonekeeper() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("clonekeeper"));
    cmd.env("NO_COLOR", "1")
        .env_remove("CLONEKEEPER_HOST")
        .env_remove("CLONEKEEPER_PORT")
        .env_remove("CLONEKEEPER_INSECURE");
    cmd
}

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

#[test]
fn test_config_help_shows_subcommands() {
    clonekeeper()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("path"));
}

#[test]
fn test_config_show_without_file_prints_defaults() {
    let (_dir, path) = temp_config_path();
    clonekeeper()
        .args(["config", "show"])
        .env("CLONEKEEPER_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("datastore1"))
        .stdout(predicate::str::contains("minutes: 5"));
}

#[test]
fn test_config_show_needs_no_credentials() {
    let (_dir, path) = temp_config_path();
    clonekeeper()
        .args(["config", "show"])
        .env("CLONEKEEPER_CONFIG", &path)
        .env_remove("VCENTER_USER")
        .env_remove("VCENTER_PASSWORD")
        .assert()
        .success();
}

#[test]
fn test_config_show_reads_file() {
    let (_dir, path) = temp_config_path();
    std::fs::write(&path, "placement:\n  source: golden-ubuntu\nretention:\n  minutes: 45\n")
        .unwrap();
    clonekeeper()
        .args(["config", "show", "--config", &path])
        .assert()
        .success()
        .stdout(predicate::str::contains("golden-ubuntu"))
        .stdout(predicate::str::contains("minutes: 45"));
}

#[test]
fn test_config_show_applies_env_override() {
    let (_dir, path) = temp_config_path();
    clonekeeper()
        .args(["config", "show"])
        .env("CLONEKEEPER_CONFIG", &path)
        .env("CLONEKEEPER_HOST", "vcenter.lab.example")
        .assert()
        .success()
        .stdout(predicate::str::contains("vcenter.lab.example"));
}

#[test]
fn test_config_show_rejects_invalid_retention() {
    let (_dir, path) = temp_config_path();
    std::fs::write(&path, "retention:\n  minutes: 0\n").unwrap();
    clonekeeper()
        .args(["config", "show"])
        .env("CLONEKEEPER_CONFIG", &path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("retention.minutes"));
}

#[test]
fn test_config_show_json_is_valid() {
    let (_dir, path) = temp_config_path();
    let output = clonekeeper()
        .args(["config", "show", "--json"])
        .env("CLONEKEEPER_CONFIG", &path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["config"]["placement"]["cluster"], "home");
    assert_eq!(value["path"], path.as_str());
}

#[test]
fn test_config_path_prints_explicit_path() {
    let (_dir, path) = temp_config_path();
    clonekeeper()
        .args(["config", "path"])
        .env("CLONEKEEPER_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("config.yaml"));
}
