//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use tempfile::TempDir;

/// Helper to get a pst command
pub fn pst() -> Command {
    Command::new(cargo::cargo_bin!("pst"))
}

/// Helper to create a test project in a temp directory
pub fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    pst().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Helper to create a catalog part
pub fn create_test_part(tmp: &TempDir, partno: &str, name: &str) {
    pst()
        .current_dir(tmp.path())
        .args(["part", "new", partno, "--name", name])
        .assert()
        .success();
}

/// Helper to add stock with an optional batch
pub fn add_stock(tmp: &TempDir, partno: &str, quantity: i64, batch: &str) {
    pst()
        .current_dir(tmp.path())
        .args([
            "stock",
            "add",
            partno,
            "-q",
            &quantity.to_string(),
            "--batch",
            batch,
        ])
        .assert()
        .success();
}

/// Helper to correct stock to an absolute value (skipping the prompt)
pub fn correct_stock(tmp: &TempDir, partno: &str, quantity: i64) {
    pst()
        .current_dir(tmp.path())
        .args(["stock", "correct", partno, "-q", &quantity.to_string(), "--yes"])
        .assert()
        .success();
}

/// Helper to replace a BOM from (child, multiplier) pairs
pub fn set_bom(tmp: &TempDir, partno: &str, lines: &[(&str, u32)]) {
    let mut cmd = pst();
    cmd.current_dir(tmp.path()).args(["stock", "set-bom", partno]);
    for (child, multiplier) in lines {
        cmd.args(["--line", &format!("{}={}", child, multiplier)]);
    }
    cmd.assert().success();
}

/// Write the project config file
pub fn write_config(tmp: &TempDir, content: &str) {
    std::fs::write(tmp.path().join(".pst/config.yaml"), content).unwrap();
}

/// Write the team roster file
pub fn write_team(tmp: &TempDir, content: &str) {
    std::fs::write(tmp.path().join(".pst/team.yaml"), content).unwrap();
}

/// Read the stored quantity of a stock entry, if the entry exists
pub fn entry_quantity(tmp: &TempDir, partno: &str) -> Option<i64> {
    let path = tmp
        .path()
        .join(format!("stock/entries/{}.pst.yaml", partno));
    if !path.exists() {
        return None;
    }
    let doc: serde_yml::Value =
        serde_yml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    doc.get("quantity").and_then(|q| q.as_i64())
}

/// Read all ledger records for a part as JSON values
pub fn ledger_records(tmp: &TempDir, partno: &str) -> Vec<serde_json::Value> {
    let path = tmp.path().join("stock/ledger.jsonl");
    if !path.exists() {
        return Vec::new();
    }
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .filter(|record| record["partno"] == partno)
        .collect()
}

/// Read an item document as a YAML value
pub fn read_item(tmp: &TempDir, serial: &str) -> serde_yml::Value {
    let path = tmp.path().join(format!("items/{}.pst.yaml", serial));
    serde_yml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Write a CSV import file and return its path
pub fn write_csv(tmp: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = tmp.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Whether a file exists relative to the project root
pub fn project_file_exists(tmp: &TempDir, relative: &str) -> bool {
    tmp.path().join(relative).exists()
}
