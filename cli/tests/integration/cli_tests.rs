//! Integration tests for the clonekeeper command surface

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn clonekeeper() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("clonekeeper"));
    cmd.env("NO_COLOR", "1")
        .env_remove("VCENTER_USER")
        .env_remove("VCENTER_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    clonekeeper().assert().code(2).stderr(predicate::str::contains(
        "Disposable linked-clone sandboxes with tag-driven expiry",
    ));
}

#[test]
fn test_cli_help_lists_lifecycle_commands() {
    clonekeeper()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create-clone"))
        .stdout(predicate::str::contains("reap-clones"))
        .stdout(predicate::str::contains("delete-vm"))
        .stdout(predicate::str::contains("refresh-timestamp"))
        .stdout(predicate::str::contains("list-clones"));
}

#[test]
fn test_help_does_not_leak_password_env() {
    clonekeeper()
        .env("VCENTER_PASSWORD", "hunter2")
        .args(["delete-vm", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_version_command_shows_version() {
    clonekeeper()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("clonekeeper 0.1.0"));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = clonekeeper()
        .args(["version", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value =
        serde_json::from_slice(&output).expect("version --json should print JSON");
    assert_eq!(value["version"], "0.1.0");
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    clonekeeper().arg("explode").assert().code(2);
}

// --- Argument validation happens before anything else ---

#[test]
fn test_create_clone_without_env_is_usage_error() {
    clonekeeper()
        .args(["create-clone", "--username", "u", "--password", "p"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--env"));
}

#[test]
fn test_delete_vm_without_vmname_is_usage_error() {
    clonekeeper()
        .arg("delete-vm")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--vmname"));
}

#[test]
fn test_refresh_timestamp_blank_vmname_is_usage_error() {
    clonekeeper()
        .args(["refresh-timestamp", "--vmname", "  "])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--vmname"));
}

// --- Missing credentials fail fast ---

#[test]
fn test_reap_clones_without_credentials_exits_two() {
    clonekeeper()
        .arg("reap-clones")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("VCENTER_USER"));
}

#[test]
fn test_delete_vm_without_password_exits_two() {
    clonekeeper()
        .args(["delete-vm", "--vmname", "dev1", "--username", "admin"])
        .assert()
        .code(2);
}

#[test]
fn test_empty_credentials_from_env_exit_two() {
    clonekeeper()
        .env("VCENTER_USER", "")
        .env("VCENTER_PASSWORD", "")
        .arg("list-clones")
        .assert()
        .code(2);
}

#[test]
fn test_missing_credentials_json_error_object() {
    let output = clonekeeper()
        .args(["reap-clones", "--json"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value =
        serde_json::from_slice(&output).expect("--json errors should print JSON");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "missing_credentials");
}
