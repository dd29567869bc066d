//! Integration tests for the generate command.

use std::fs;
use std::process::Command;
use tempfile::TempDir;
use xsort_lib::sort::{ComparisonMode, parse_record};

use crate::helpers::{assert_sorted, read_lines};

#[test]
fn test_generate_then_sort() {
    let dir = TempDir::new().unwrap();
    let generated = dir.path().join("generated.txt");
    let sorted = dir.path().join("sorted.txt");

    let status = Command::new(env!("CARGO_BIN_EXE_xsort"))
        .args(["generate", "-o", generated.to_str().unwrap(), "--count", "3000", "--seed", "42"])
        .status()
        .expect("Failed to run xsort generate");
    assert!(status.success());

    let lines = read_lines(&generated);
    assert_eq!(lines.len(), 3000);
    for line in &lines {
        let record = parse_record(line).unwrap();
        assert!((16..256).contains(&record.text.len()));
    }

    let status = Command::new(env!("CARGO_BIN_EXE_xsort"))
        .args([
            "sort",
            "-i",
            generated.to_str().unwrap(),
            "-o",
            sorted.to_str().unwrap(),
            "--chunk-size",
            "64K",
            "--threads",
            "2",
        ])
        .status()
        .expect("Failed to run xsort sort");
    assert!(status.success());
    assert_sorted(&read_lines(&sorted), ComparisonMode::Ordinal);
    assert_eq!(fs::metadata(&sorted).unwrap().len(), fs::metadata(&generated).unwrap().len());
}

#[test]
fn test_generate_is_reproducible_with_seed() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    for path in [&a, &b] {
        let status = Command::new(env!("CARGO_BIN_EXE_xsort"))
            .args(["generate", "-o", path.to_str().unwrap(), "-n", "100", "--seed", "7"])
            .status()
            .unwrap();
        assert!(status.success());
    }
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}
