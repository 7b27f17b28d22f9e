#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: open an account and deposit
    let csv1 = common::commands_file(&["open, , , 0, hugo, EUR,", "deposit, 1, , 10000, , , a"])
        .unwrap();

    let output1 = Command::new(cargo_bin!("txledger"))
        .arg(csv1.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,hugo,EUR,10000,100.00"));

    // 2. Second run: a new account gets the next id and money moves between them
    let csv2 = common::commands_file(&["open, , , 0, iris, EUR,", "transfer, 1, 2, 2500, , , b"])
        .unwrap();

    let output2 = Command::new(cargo_bin!("txledger"))
        .arg(csv2.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--journal")
        .arg(dir.path().join("journal.csv"))
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("1,hugo,EUR,7500,75.00"));
    assert!(stdout2.contains("2,iris,EUR,2500,25.00"));

    // The journal spans both runs: one deposit plus one transfer pair.
    let journal = std::fs::read_to_string(dir.path().join("journal.csv")).unwrap();
    assert_eq!(journal.lines().count(), 4);
}
