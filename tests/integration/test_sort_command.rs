//! Integration tests for the sort command.

use std::fs;
use std::process::Command;
use tempfile::TempDir;
use xsort_lib::sort::ComparisonMode;

use crate::helpers::{assert_same_lines, assert_sorted, random_records, read_lines, write_lines};

fn xsort() -> Command {
    Command::new(env!("CARGO_BIN_EXE_xsort"))
}

#[test]
fn test_sort_concrete_scenario() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("output.txt");
    fs::write(&input, "30. banana\n2. apple\n10. apple\n").unwrap();

    let status = xsort()
        .args(["sort", "-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()])
        .status()
        .expect("Failed to run xsort sort");
    assert!(status.success());
    assert_eq!(fs::read_to_string(&output).unwrap(), "2. apple\n10. apple\n30. banana\n");
}

#[test]
fn test_sort_default_output_path() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("records.txt");
    fs::write(&input, "2. b\n1. a\n").unwrap();

    let status =
        xsort()
            .args(["sort", "-i", input.to_str().unwrap()])
            .status()
            .expect("Failed to run xsort");
    assert!(status.success());
    assert_eq!(fs::read_to_string(dir.path().join("records.sorted.txt")).unwrap(), "1. a\n2. b\n");
}

#[test]
fn test_sort_with_spills_threads_and_compression() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("output.txt");
    let tmp = dir.path().join("tmp");
    fs::create_dir(&tmp).unwrap();
    let lines = random_records(20_000, 11);
    write_lines(&input, &lines);

    let status = xsort()
        .args([
            "sort",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--chunk-size",
            "16K",
            "--threads",
            "3",
            "--comparison",
            "invariant-ignore-case",
            "--temp-compression",
            "1",
            "--tmp-dir",
            tmp.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run xsort sort");
    assert!(status.success());

    let sorted = read_lines(&output);
    assert_same_lines(&sorted, &lines);
    assert_sorted(&sorted, ComparisonMode::InvariantIgnoreCase);
    assert_eq!(fs::read_dir(&tmp).unwrap().count(), 0, "spill files left behind");
}

#[test]
fn test_verify_passes_and_fails() {
    let dir = TempDir::new().unwrap();
    let unsorted = dir.path().join("unsorted.txt");
    let sorted = dir.path().join("sorted.txt");
    write_lines(&unsorted, &random_records(2000, 3));

    let status = xsort()
        .args(["sort", "-i", unsorted.to_str().unwrap(), "-o", sorted.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());

    let pass = xsort().args(["sort", "-i", sorted.to_str().unwrap(), "--verify"]).status().unwrap();
    assert!(pass.success());

    let fail =
        xsort().args(["sort", "-i", unsorted.to_str().unwrap(), "--verify"]).status().unwrap();
    assert!(!fail.success());
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.txt");
    let output = xsort().args(["sort", "-i", missing.to_str().unwrap()]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_malformed_input_reports_line() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    fs::write(&input, "1. fine\nthis is not a record\n").unwrap();
    let output = xsort().args(["sort", "-i", input.to_str().unwrap()]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("this is not a record"), "stderr: {stderr}");
    assert!(!dir.path().join("input.sorted.txt").exists());
}
