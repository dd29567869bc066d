//! Checking that a file is already in sorted order.

use std::fs::File;
use std::path::Path;

use log::info;

use super::chunk_reader::ChunkReader;
use super::collation::ComparisonMode;
use super::encoding::TextEncoding;
use super::keys::KeyDeriver;
use super::parser::{LineStats, Parser};
use crate::errors::Result;
use crate::logging::format_count;

/// Read size used while verifying.
const VERIFY_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Outcome of [`verify_sorted`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Records checked.
    pub records: u64,
    /// Records whose key is smaller than the previous record's key.
    pub violations: u64,
    /// 1-based record number and text of the first out-of-order record.
    pub first_violation: Option<(u64, String)>,
}

impl VerifyReport {
    /// Whether the file is in sorted order.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.violations == 0
    }
}

/// Stream `input` and count records that sort before their predecessor.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds a malformed record.
pub fn verify_sorted(
    input: &Path,
    comparison: ComparisonMode,
    encoding: TextEncoding,
) -> Result<VerifyReport> {
    let file = File::open(input)?;
    let mut reader =
        ChunkReader::new(file, VERIFY_CHUNK_SIZE, encoding.terminator()).skip_bom(encoding.bom());
    let parser = Parser::new(KeyDeriver::new(comparison), encoding);
    let stats = LineStats::default();

    let mut report = VerifyReport::default();
    let mut previous: Vec<u8> = Vec::new();
    let mut raw = Vec::new();
    let mut keys = Vec::new();
    loop {
        let (n, end) = reader.read_chunk(&mut raw)?;
        if n > 0 {
            let chunk = parser.parse(raw, keys, &stats)?;
            for (line, key) in chunk.records() {
                report.records += 1;
                if report.records > 1 && key < previous.as_slice() {
                    report.violations += 1;
                    if report.first_violation.is_none() {
                        let text = encoding.decode_line(line).into_owned();
                        report.first_violation = Some((report.records, text));
                    }
                }
                previous.clear();
                previous.extend_from_slice(key);
            }
            (raw, keys) = chunk.into_buffers();
        }
        if end {
            break;
        }
    }

    info!(
        "Verified {} records: {} violations",
        format_count(report.records),
        format_count(report.violations)
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn verify(text: &str, mode: ComparisonMode) -> VerifyReport {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.txt");
        fs::write(&path, text).unwrap();
        verify_sorted(&path, mode, TextEncoding::UTF8).unwrap()
    }

    #[test]
    fn test_sorted_file_passes() {
        let report = verify("2. apple\n10. apple\n30. banana\n", ComparisonMode::Ordinal);
        assert!(report.is_sorted());
        assert_eq!(report.records, 3);
        assert_eq!(report.first_violation, None);
    }

    #[test]
    fn test_unsorted_file_reports_first_violation() {
        let input = "30. banana\n2. apple\n10. apple\n1. aardvark\n";
        let report = verify(input, ComparisonMode::Ordinal);
        assert!(!report.is_sorted());
        assert_eq!(report.violations, 2);
        assert_eq!(report.first_violation, Some((2, "2. apple".to_string())));
    }

    #[test]
    fn test_tie_break_by_id_is_checked() {
        let report = verify("10. apple\n2. apple\n", ComparisonMode::Ordinal);
        assert_eq!(report.violations, 1);
    }

    #[test]
    fn test_verdict_depends_on_mode() {
        let text = "1. a\n2. B\n3. c\n";
        assert!(!verify(text, ComparisonMode::Ordinal).is_sorted());
        assert!(verify(text, ComparisonMode::OrdinalIgnoreCase).is_sorted());
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(verify("", ComparisonMode::Ordinal), VerifyReport::default());
    }
}
