//! CLI integration tests
//!
//! These run the `zipsync` binary against fixture files in a temp dir and
//! check its JSON output.

use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_zipsync"))
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

const EXISTING: &str = r#"[
    {"key": "a", "fields": {"title": "old a"}},
    {"key": "c", "fields": {"title": "old c"}}
]"#;

const INCOMING: &str = r#"[
    {"key": "c", "fields": {"title": "new c"}},
    {"key": "b", "fields": {"title": "new b"}, "parent": "a"},
    {"key": "a", "fields": {"title": "new a"}}
]"#;

#[test]
fn test_reconcile_reports_inserts_and_updates() {
    // Given: two existing records and three incoming ones
    let dir = TempDir::new().unwrap();
    let existing = write(&dir, "existing.json", EXISTING);
    let incoming = write(&dir, "incoming.json", INCOMING);
    let output_path = dir.path().join("out.json");

    // When: `zipsync reconcile` runs
    let output = run(&[
        "reconcile",
        "--existing",
        existing.to_str().unwrap(),
        "--incoming",
        incoming.to_str().unwrap(),
        "--output",
        output_path.to_str().unwrap(),
    ]);

    // Then: b is inserted, a and c are updated
    let report = stdout_json(&output);
    assert_eq!(report["dry_run"], false);
    assert_eq!(report["inserted_keys"], serde_json::json!(["b"]));
    assert_eq!(report["updated_keys"], serde_json::json!(["a", "c"]));
    assert_eq!(report["total"], 3);

    // And: the written records carry the new values and the parent link
    let records: Vec<Value> =
        serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["key"], "a");
    assert_eq!(records[0]["fields"]["title"], "new a");
    assert!(records[1]["parent"].is_string());
}

#[test]
fn test_reconcile_dry_run_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let existing = write(&dir, "existing.json", EXISTING);
    let incoming = write(&dir, "incoming.json", INCOMING);
    let output_path = dir.path().join("out.json");

    let output = run(&[
        "reconcile",
        "--existing",
        existing.to_str().unwrap(),
        "--incoming",
        incoming.to_str().unwrap(),
        "--output",
        output_path.to_str().unwrap(),
        "--dry-run",
    ]);

    let report = stdout_json(&output);
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["inserted"], 1);
    assert_eq!(report["updated"], 2);
    assert!(!output_path.exists());
}

#[test]
fn test_reconcile_with_config_file() {
    let dir = TempDir::new().unwrap();
    let incoming = write(&dir, "incoming.json", INCOMING);
    let config = write(
        &dir,
        "zipsync.toml",
        "batch_size = 1\n\n[cache]\ncount_limit = 100\n",
    );

    let output = run(&[
        "reconcile",
        "--incoming",
        incoming.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);

    let report = stdout_json(&output);
    assert_eq!(report["inserted_keys"], serde_json::json!(["a", "b", "c"]));
    assert_eq!(report["total"], 3);
}

#[test]
fn test_reconcile_rejects_duplicate_incoming_keys() {
    let dir = TempDir::new().unwrap();
    let incoming = write(&dir, "incoming.json", r#"[{"key": "x"}, {"key": "x"}]"#);

    let output = run(&["reconcile", "--incoming", incoming.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Duplicate key x"));
}

#[test]
fn test_reconcile_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let incoming = write(&dir, "incoming.json", "[]");
    let config = write(&dir, "zipsync.toml", "batch_size = 0\n");

    let output = run(&[
        "reconcile",
        "--incoming",
        incoming.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("batch_size"));
}

#[test]
fn test_diff_prints_edit_operations() {
    // Given: a list where row "y" moved to the front and "z" was added
    let dir = TempDir::new().unwrap();
    let old = write(
        &dir,
        "old.json",
        r#"[{"name": "main", "items": [{"key": "x", "payload": 1}, {"key": "y", "payload": 2}]}]"#,
    );
    let new = write(
        &dir,
        "new.json",
        r#"[{"name": "main", "items": [{"key": "y", "payload": 2}, {"key": "x", "payload": 1}, {"key": "z", "payload": 3}]}]"#,
    );

    // When: `zipsync diff` runs
    let output = run(&[
        "diff",
        "--old",
        old.to_str().unwrap(),
        "--new",
        new.to_str().unwrap(),
    ]);

    // Then: the edits are an insert followed by update-then-move
    let edits = stdout_json(&output);
    let ops: Vec<&str> = edits
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["op"].as_str().unwrap())
        .collect();
    assert_eq!(ops, vec!["insert", "update", "move"]);
    assert_eq!(edits[0]["at"], serde_json::json!({"section": 0, "item": 2}));
}

#[test]
fn test_unknown_log_profile_is_rejected() {
    let dir = TempDir::new().unwrap();
    let incoming = write(&dir, "incoming.json", "[]");

    let output = run(&[
        "--log",
        "verbose",
        "reconcile",
        "--incoming",
        incoming.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
}

#[test]
fn test_dev_logging_keeps_stdout_clean() {
    let dir = TempDir::new().unwrap();
    let incoming = write(&dir, "incoming.json", r#"[{"key": "only"}]"#);

    let output = run(&[
        "reconcile",
        "--incoming",
        incoming.to_str().unwrap(),
        "--log",
        "dev",
    ]);

    let report = stdout_json(&output);
    assert_eq!(report["inserted"], 1);
}
