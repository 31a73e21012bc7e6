//! Shared helpers for integration tests.

#![allow(dead_code)]

use schema_ledger::prelude::*;
use tempfile::TempDir;

/// Builds a `SHOW CREATE TABLE` style definition from element lines.
pub fn definition(table: &str, lines: &[&str]) -> String {
    let body = lines
        .iter()
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE `{table}` (\n{body}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4")
}

/// A file-backed ledger rooted in a fresh temporary directory.
pub fn file_ledger() -> (TempDir, Ledger<FileLogStore>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = LedgerConfig::new(dir.path().join("doc"), "test-host").unwrap();
    let ledger = Ledger::open(&config);
    (dir, ledger)
}

/// Runs one capture and returns its statements.
pub fn statements(ledger: &Ledger<FileLogStore>, table: &str, def: &str) -> Vec<String> {
    ledger.capture(table, def, false).unwrap().statements
}
