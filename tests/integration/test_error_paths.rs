//! Error path integration tests.
//!
//! Every failure must surface as an error, leave the destination untouched and
//! leave no spill files behind.

use rstest::rstest;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use xsort_lib::SortError;
use xsort_lib::sort::ExternalSorter;

use crate::helpers::{random_records, write_lines};

fn sorter(tmp: &Path, parallelism: usize) -> ExternalSorter {
    ExternalSorter::new()
        .chunk_size(4096)
        .parallelism(parallelism)
        .temp_compression(1)
        .temp_dir(tmp.to_path_buf())
}

fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[rstest]
#[case::serial(0)]
#[case::one_worker(1)]
#[case::four_workers(4)]
fn test_malformed_record_cleans_up(#[case] parallelism: usize) {
    let dir = TempDir::new().unwrap();
    let tmp = dir.path().join("tmp");
    fs::create_dir(&tmp).unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("output.txt");

    let mut lines = random_records(10_000, 5);
    lines.insert(7_500, "12 missing the delimiter".to_string());
    write_lines(&input, &lines);

    let err = sorter(&tmp, parallelism).sort(&input, &output).unwrap_err();
    assert!(err.is_malformed_record(), "unexpected error: {err}");
    assert!(err.to_string().contains("12 missing the delimiter"));
    assert!(!output.exists());
    assert_eq!(entries(&tmp), 0);
    assert_eq!(entries(dir.path()), 2);
}

#[rstest]
#[case("abc. text", "id is not a non-negative integer")]
#[case("-4. text", "id is not a non-negative integer")]
#[case("99999999999999999999999. text", "id does not fit in 64 bits")]
#[case("17.text", "missing '. ' delimiter")]
fn test_malformed_record_reasons(#[case] line: &str, #[case] reason: &str) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    fs::write(&input, format!("1. ok\n{line}\n")).unwrap();
    let err = ExternalSorter::new().sort(&input, &dir.path().join("out.txt")).unwrap_err();
    match err {
        SortError::MalformedRecord { line: echoed, reason: actual } => {
            assert_eq!(echoed, line);
            assert_eq!(actual, reason);
        }
        other => panic!("expected a malformed record error, got {other}"),
    }
}

#[rstest]
#[case::serial(0)]
#[case::parallel(3)]
fn test_read_failure_cleans_up(#[case] parallelism: usize) {
    let dir = TempDir::new().unwrap();
    let tmp = dir.path().join("tmp");
    fs::create_dir(&tmp).unwrap();
    // Opening a directory succeeds on Linux but reading it fails.
    let input = dir.path().join("not_a_file");
    fs::create_dir(&input).unwrap();
    let output = dir.path().join("output.txt");
    fs::write(&output, "keep me").unwrap();

    let sorter =
        ExternalSorter::new().chunk_size(1024).parallelism(parallelism).temp_dir(tmp.clone());
    let err = sorter.sort(&input, &output).unwrap_err();
    assert!(matches!(err, SortError::Io(_)), "unexpected error: {err}");
    assert_eq!(fs::read_to_string(&output).unwrap(), "keep me");
    assert_eq!(entries(&tmp), 0);
}

#[test]
fn test_missing_output_directory() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    fs::write(&input, "1. a\n").unwrap();
    let output = dir.path().join("missing").join("out.txt");
    assert!(ExternalSorter::new().sort(&input, &output).is_err());
}

#[test]
fn test_unknown_encoding_label() {
    let err = xsort_lib::sort::TextEncoding::for_label("not-an-encoding").unwrap_err();
    assert!(matches!(err, SortError::UnknownEncoding(_)));
}
