//! End-to-end tests for the `aizen` binary
//!
//! Every run points at a temporary state database and a missing config file,
//! and blanks the API key so nothing reaches the network or the keyring.

mod common;

use assert_cmd::Command;
use common::create_temp_store;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn aizen(state_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("aizen").expect("binary should build");
    cmd.env("AIZEN_STATE_DB", state_dir.join("state.db"))
        .env("GOOGLE_API_KEY", "")
        .env("NO_COLOR", "1")
        .env_remove("AIZEN_PROVIDER")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(state_dir.join("missing.yaml"));
    cmd
}

#[test]
fn test_ask_without_key_reports_configuration_message() {
    let tmp = TempDir::new().unwrap();
    aizen(tmp.path())
        .args(["ask", "What is bushido?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_API_KEY is missing or invalid"));
}

#[test]
fn test_haiku_without_key_reports_configuration_message() {
    let tmp = TempDir::new().unwrap();
    aizen(tmp.path())
        .args(["haiku", "autumn"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_API_KEY is missing or invalid"));
}

#[test]
fn test_invalid_provider_is_rejected() {
    let tmp = TempDir::new().unwrap();
    aizen(tmp.path())
        .args(["--provider", "openai", "ask", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid provider type"));
}

#[test]
fn test_prefs_set_then_show() {
    let tmp = TempDir::new().unwrap();
    aizen(tmp.path())
        .args(["prefs", "set", "--tone", "formal", "--length", "brief"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Preferences saved"));

    aizen(tmp.path())
        .args(["prefs", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Formal").and(predicate::str::contains("Brief")));
}

#[test]
fn test_prefs_set_rejects_unknown_value() {
    let tmp = TempDir::new().unwrap();
    aizen(tmp.path())
        .args(["prefs", "set", "--tone", "sarcastic"])
        .assert()
        .failure();
}

#[test]
fn test_history_show_and_clear() {
    let (store, tmp) = create_temp_store();
    aizen(tmp.path())
        .args(["history", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No conversation history found"));

    store
        .save_history(&[
            aizen::agent::ChatTurn::user("What is rectitude?"),
            aizen::agent::ChatTurn::assistant("The power to decide upon a course of conduct."),
        ])
        .unwrap();

    aizen(tmp.path())
        .args(["history", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("What is rectitude?"));

    aizen(tmp.path())
        .args(["history", "clear"])
        .assert()
        .success();
    assert!(store.load_history().unwrap().is_empty());
}
