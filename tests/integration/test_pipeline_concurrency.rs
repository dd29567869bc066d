//! Serial and multi-threaded runs must produce byte-identical output.

use rstest::rstest;
use std::fs;
use tempfile::TempDir;
use xsort_lib::sort::{ComparisonMode, ExternalSorter, SortAlgorithm};

use crate::helpers::{assert_same_lines, assert_sorted, random_records, read_lines, write_lines};

#[rstest]
fn test_parallelism_does_not_change_output(
    #[values(0, 1, 2, 8)] parallelism: usize,
    #[values(SortAlgorithm::Comparison, SortAlgorithm::RadixQuick, SortAlgorithm::CountingRadix)]
    algorithm: SortAlgorithm,
) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    let lines = random_records(15_000, 21);
    write_lines(&input, &lines);

    let reference = dir.path().join("reference.txt");
    ExternalSorter::new().sort(&input, &reference).unwrap();

    let output = dir.path().join("output.txt");
    let stats = ExternalSorter::new()
        .chunk_size(8 * 1024)
        .parallelism(parallelism)
        .algorithm(algorithm)
        .sort(&input, &output)
        .unwrap();

    assert!(stats.chunks_written > 10);
    assert_eq!(stats.total_records, 15_000);
    assert_eq!(fs::read(&output).unwrap(), fs::read(&reference).unwrap());
}

#[rstest]
#[case(ComparisonMode::Ordinal)]
#[case(ComparisonMode::OrdinalIgnoreCase)]
#[case(ComparisonMode::Culture)]
#[case(ComparisonMode::CultureIgnoreCase)]
#[case(ComparisonMode::Invariant)]
#[case(ComparisonMode::InvariantIgnoreCase)]
fn test_every_mode_sorts_across_chunks(#[case] mode: ComparisonMode) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("output.txt");
    let lines = random_records(6_000, 99);
    write_lines(&input, &lines);

    ExternalSorter::new()
        .chunk_size(4096)
        .parallelism(2)
        .comparison(mode)
        .temp_compression(1)
        .sort(&input, &output)
        .unwrap();

    let sorted = read_lines(&output);
    assert_same_lines(&sorted, &lines);
    assert_sorted(&sorted, mode);
}

#[test]
fn test_lines_longer_than_chunk() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("output.txt");
    let mut lines = random_records(200, 4);
    lines.push(format!("5. {}", "z".repeat(5000)));
    lines.push(format!("4. {}", "a".repeat(3000)));
    write_lines(&input, &lines);

    let stats =
        ExternalSorter::new().chunk_size(1024).parallelism(2).sort(&input, &output).unwrap();
    assert_eq!(stats.max_line_len, 5003);

    let sorted = read_lines(&output);
    assert_same_lines(&sorted, &lines);
    assert_sorted(&sorted, ComparisonMode::Ordinal);
}
