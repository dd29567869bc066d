//! Top-level external sort driver.
//!
//! Phase 1 splits the input into sorted spill files (see
//! [`SpillPipeline`]); phase 2 merges them into the output. When the whole
//! input fits in one chunk the spill round-trip is skipped and the sorted chunk
//! is written directly.
//!
//! Output goes to a temporary file next to the destination that is renamed into
//! place only after everything has been written, so a failed run never replaces
//! an existing file. Spill files live in a per-run private directory that is
//! removed when the run ends, successfully or not.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;

use super::buffer_pool::BufferPool;
use super::chunk_reader::ChunkReader;
use super::chunk_sorter::{SortAlgorithm, sort_chunk};
use super::collation::ComparisonMode;
use super::encoding::TextEncoding;
use super::keys::KeyDeriver;
use super::merge::merge_spills;
use super::parser::{LineStats, Parser};
use super::pipeline::{ReadSummary, SpillPipeline};
use super::spill::SpillRegistry;
use crate::errors::Result;
use crate::logging::{OperationTimer, format_bytes, format_count};
use crate::validation::{validate_chunk_size, validate_compression_level};

/// Default chunk size: 100 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024 * 1024;

const OUTPUT_BUFFER_SIZE: usize = 1024 * 1024;

/// Statistics from one sort run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Total records read from input.
    pub total_records: u64,
    /// Records written to output.
    pub output_records: u64,
    /// Number of spill files written.
    pub chunks_written: usize,
    /// Bytes read from input.
    pub bytes_read: u64,
    /// Longest input line, in bytes.
    pub max_line_len: usize,
    /// Longest derived key, in bytes.
    pub max_key_len: usize,
}

/// External sorter for `<id>. <text>` record files.
///
/// ```no_run
/// use xsort_lib::sort::{ComparisonMode, ExternalSorter};
/// use std::path::Path;
///
/// let stats = ExternalSorter::new()
///     .chunk_size(64 * 1024 * 1024)
///     .parallelism(4)
///     .comparison(ComparisonMode::InvariantIgnoreCase)
///     .sort(Path::new("input.txt"), Path::new("sorted.txt"))?;
/// println!("{} records", stats.output_records);
/// # Ok::<(), xsort_lib::errors::SortError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExternalSorter {
    /// Bytes of input per in-memory chunk.
    chunk_size: usize,
    /// Parser and sorter worker count; 0 runs serially.
    parallelism: usize,
    /// Text comparison mode.
    comparison: ComparisonMode,
    /// Input and output text encoding.
    encoding: TextEncoding,
    /// In-memory chunk sort algorithm.
    algorithm: SortAlgorithm,
    /// Base directory for the per-run spill directory.
    temp_dir: Option<PathBuf>,
    /// Compression level for spill files (0 = uncompressed).
    temp_compression: u32,
}

impl Default for ExternalSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalSorter {
    /// Create a sorter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallelism: 0,
            comparison: ComparisonMode::default(),
            encoding: TextEncoding::default(),
            algorithm: SortAlgorithm::default(),
            temp_dir: None,
            temp_compression: 0,
        }
    }

    /// Set the chunk size in bytes.
    #[must_use]
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set the number of parser and sorter workers (0 = serial).
    #[must_use]
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers;
        self
    }

    /// Set the text comparison mode.
    #[must_use]
    pub fn comparison(mut self, mode: ComparisonMode) -> Self {
        self.comparison = mode;
        self
    }

    /// Set the text encoding of input and output.
    #[must_use]
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the in-memory chunk sort algorithm.
    #[must_use]
    pub fn algorithm(mut self, algorithm: SortAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the base directory for spill files.
    #[must_use]
    pub fn temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_dir = Some(path);
        self
    }

    /// Set the gzip level for spill files.
    ///
    /// Level 0 (default) writes spills uncompressed. Level 1 trades a little
    /// CPU for much less temporary disk space.
    #[must_use]
    pub fn temp_compression(mut self, level: u32) -> Self {
        self.temp_compression = level;
        self
    }

    /// Sort `input` into `output`.
    ///
    /// `output` may be the same path as `input`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid settings, malformed records, I/O failures
    /// and spill decode failures. On error `output` is left untouched and all
    /// spill files are removed.
    pub fn sort(&self, input: &Path, output: &Path) -> Result<SortStats> {
        validate_chunk_size(self.chunk_size)?;
        validate_compression_level(self.temp_compression)?;

        info!("Starting sort with comparison: {}", self.comparison);
        info!("Chunk size: {}", format_bytes(self.chunk_size as u64));
        info!("Parallelism: {}", self.parallelism);
        info!("Encoding: {}, algorithm: {}", self.encoding, self.algorithm);

        let timer = OperationTimer::new("Sorting records");
        let file = File::open(input)?;
        let input_len = file.metadata()?.len();
        let reader = ChunkReader::new(file, self.chunk_size, self.encoding.terminator())
            .skip_bom(self.encoding.bom());
        let parser = Parser::new(KeyDeriver::new(self.comparison), self.encoding);
        let line_stats = LineStats::default();

        let mut staged = StagedOutput::create(output)?;
        let mut stats = if input_len <= self.chunk_size as u64 {
            self.sort_in_memory(reader, parser, &line_stats, &mut staged)?
        } else {
            self.sort_with_spills(reader, parser, &line_stats, &mut staged)?
        };
        staged.persist(output)?;

        stats.total_records = line_stats.records();
        stats.max_line_len = line_stats.max_line_len();
        stats.max_key_len = line_stats.max_key_len();
        info!(
            "Sort complete: {} records, {} spill files, longest line {}",
            format_count(stats.output_records),
            stats.chunks_written,
            format_bytes(stats.max_line_len as u64)
        );
        timer.log_completion(stats.output_records);
        Ok(stats)
    }

    fn sort_in_memory<R: Read>(
        &self,
        mut reader: ChunkReader<R>,
        parser: Parser,
        line_stats: &LineStats,
        out: &mut StagedOutput,
    ) -> Result<SortStats> {
        info!("All records fit in memory, performing in-memory sort");

        let mut raw = Vec::new();
        let mut part = Vec::new();
        loop {
            let (_, end) = reader.read_chunk(&mut part)?;
            raw.append(&mut part);
            if end {
                break;
            }
        }

        let mut chunk = parser.parse(raw, Vec::new(), line_stats)?;
        sort_chunk(&mut chunk, self.algorithm, self.parallelism > 0);

        if reader.bom_found() {
            out.write_all(self.encoding.bom())?;
        }
        let terminator = self.encoding.terminator().as_bytes();
        for (line, _) in chunk.records() {
            out.write_all(line)?;
            out.write_all(terminator)?;
        }

        Ok(SortStats {
            output_records: chunk.len() as u64,
            bytes_read: reader.bytes_read(),
            ..SortStats::default()
        })
    }

    fn sort_with_spills<R: Read + Send>(
        &self,
        reader: ChunkReader<R>,
        parser: Parser,
        line_stats: &LineStats,
        out: &mut StagedOutput,
    ) -> Result<SortStats> {
        let registry = SpillRegistry::new(self.temp_dir.as_deref())?;

        info!("Phase 1: Reading and sorting chunks...");
        let summary = self.spill_phase(reader, parser, line_stats, &registry)?;
        let chunks_written = registry.len();
        info!(
            "Read {} records ({}) into {} chunks",
            format_count(line_stats.records()),
            format_bytes(summary.bytes_read),
            chunks_written
        );

        info!("Phase 2: Merging {chunks_written} chunks...");
        let merged = self.merge_phase(&registry, summary, line_stats, out)?;
        registry.remove_all();

        Ok(SortStats {
            output_records: merged,
            chunks_written,
            bytes_read: summary.bytes_read,
            ..SortStats::default()
        })
    }

    /// Split the input into sorted spill files registered with `registry`.
    fn spill_phase<R: Read + Send>(
        &self,
        reader: ChunkReader<R>,
        parser: Parser,
        line_stats: &LineStats,
        registry: &SpillRegistry,
    ) -> Result<ReadSummary> {
        let writers = self.parallelism.div_ceil(2);
        let max_pooled = 2 * (3 * self.parallelism + 2 * writers + 1);
        let pool = BufferPool::new(self.chunk_size, max_pooled);

        let pipeline = SpillPipeline {
            parser,
            algorithm: self.algorithm,
            parallelism: self.parallelism,
            compression_level: self.temp_compression,
            registry,
            stats: line_stats,
            pool: &pool,
        };
        pipeline.run(reader)
    }

    /// Merge every spill in `registry` into `out`, preceded by the BOM if the
    /// input had one.
    fn merge_phase<W: Write>(
        &self,
        registry: &SpillRegistry,
        summary: ReadSummary,
        line_stats: &LineStats,
        out: &mut W,
    ) -> Result<u64> {
        if summary.bom_found {
            out.write_all(self.encoding.bom())?;
        }
        merge_spills(
            &registry.paths(),
            line_stats.merge_buffer_size(),
            self.temp_compression > 0,
            self.encoding.terminator(),
            out,
        )
    }
}

/// Output written to a temporary file in the destination directory.
///
/// Dropping it without calling [`StagedOutput::persist`] deletes the file.
struct StagedOutput {
    writer: BufWriter<NamedTempFile>,
}

impl StagedOutput {
    fn create(output: &Path) -> Result<Self> {
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = tempfile::Builder::new().prefix(".xsort-").suffix(".tmp").tempfile_in(dir)?;
        Ok(Self { writer: BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file) })
    }

    fn persist(self, output: &Path) -> Result<()> {
        let file = self.writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.as_file().sync_all()?;
        file.persist(output).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Write for StagedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Default output path for `input`: `<stem>.sorted.<ext>` in the same directory.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}.sorted.{}", ext.to_string_lossy()),
        None => format!("{stem}.sorted"),
    };
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SortError;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn sort_text(sorter: &ExternalSorter, text: &[u8]) -> (Vec<u8>, SortStats) {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input.txt");
        let output = dir.path().join("output.txt");
        fs::write(&input, text).unwrap();
        let stats = sorter.sort(&input, &output).unwrap();
        (fs::read(&output).unwrap(), stats)
    }

    fn records(n: usize) -> String {
        (0..n).map(|i| format!("{}. item {}\n", (i * 31) % 977, (i * 17) % 101)).collect()
    }

    #[test]
    fn test_concrete_scenario() {
        let (out, stats) =
            sort_text(&ExternalSorter::new(), b"30. banana\n2. apple\n10. apple\n");
        assert_eq!(out, b"2. apple\n10. apple\n30. banana\n");
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.output_records, 3);
        assert_eq!(stats.chunks_written, 0);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(0, 1)]
    #[case(1, 0)]
    #[case(3, 6)]
    fn test_spill_path_matches_in_memory(#[case] parallelism: usize, #[case] level: u32) {
        let text = records(4000);
        let (expected, _) = sort_text(&ExternalSorter::new(), text.as_bytes());

        let sorter = ExternalSorter::new()
            .chunk_size(2048)
            .parallelism(parallelism)
            .temp_compression(level);
        let (out, stats) = sort_text(&sorter, text.as_bytes());
        assert!(stats.chunks_written > 1);
        assert_eq!(stats.total_records, 4000);
        assert_eq!(stats.output_records, 4000);
        assert_eq!(stats.bytes_read, text.len() as u64);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_missing_final_terminator_is_added() {
        let (out, _) = sort_text(&ExternalSorter::new(), b"2. b\n1. a");
        assert_eq!(out, b"1. a\n2. b\n");
    }

    #[test]
    fn test_empty_input() {
        let (out, stats) = sort_text(&ExternalSorter::new(), b"");
        assert!(out.is_empty());
        assert_eq!(stats, SortStats::default());
    }

    #[test]
    fn test_bom_is_preserved() {
        let text = b"\xEF\xBB\xBF2. b\n1. a\n";
        let (out, _) = sort_text(&ExternalSorter::new(), text);
        assert_eq!(out, b"\xEF\xBB\xBF1. a\n2. b\n");

        let mut long = b"\xEF\xBB\xBF".to_vec();
        long.extend_from_slice(records(500).as_bytes());
        let (out, stats) = sort_text(&ExternalSorter::new().chunk_size(1024), &long);
        assert!(stats.chunks_written > 1);
        assert!(out.starts_with(b"\xEF\xBB\xBF"));
        assert_eq!(out.len(), long.len());
    }

    #[test]
    fn test_utf16_input() {
        let encode = |s: &str| -> Vec<u8> { s.encode_utf16().flat_map(u16::to_le_bytes).collect() };
        let sorter = ExternalSorter::new().encoding(TextEncoding::for_label("utf-16le").unwrap());
        let (out, _) = sort_text(&sorter, &encode("30. banana\n2. apple\n10. apple\n"));
        assert_eq!(out, encode("2. apple\n10. apple\n30. banana\n"));
    }

    #[test]
    fn test_sort_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, records(300)).unwrap();
        ExternalSorter::new().chunk_size(1024).sort(&path, &path).unwrap();
        let sorted = fs::read_to_string(&path).unwrap();
        assert_eq!(sorted.lines().count(), 300);
        assert!(sorted.starts_with("0. item 0\n"));
    }

    #[test]
    fn test_failure_leaves_output_and_temp_dir_clean() {
        let dir = TempDir::new().unwrap();
        let spill_base = dir.path().join("spills");
        fs::create_dir(&spill_base).unwrap();
        let input = dir.path().join("input.txt");
        let output = dir.path().join("output.txt");
        let mut text = records(2000);
        text.push_str("broken line\n");
        fs::write(&input, text).unwrap();
        fs::write(&output, "previous contents").unwrap();

        let err = ExternalSorter::new()
            .chunk_size(1024)
            .parallelism(2)
            .temp_dir(spill_base.clone())
            .sort(&input, &output)
            .unwrap_err();
        assert!(err.is_malformed_record());
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous contents");
        assert_eq!(fs::read_dir(&spill_base).unwrap().count(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[rstest]
    fn test_first_spill_line_length_matching_gzip_magic(#[values(0, 2)] parallelism: usize) {
        // 0x8B1F bytes: the raw spill starts with the gzip magic 1f 8b.
        let long = format!("0. {}\n", "a".repeat(0x8B1F - 3));
        let mut text = long.clone();
        text.extend((1..=2000).map(|i| format!("{i}. b{}\n", i % 7)));

        let sorter = ExternalSorter::new().chunk_size(40_000).parallelism(parallelism);
        let (out, stats) = sort_text(&sorter, text.as_bytes());
        assert!(stats.chunks_written > 1);
        assert_eq!(stats.output_records, 2001);
        assert!(out.starts_with(long.as_bytes()));
        assert_eq!(out.len(), text.len());
    }

    /// Input, output with prior contents, and a spill base for phase-level tests.
    struct FailureFixture {
        dir: TempDir,
        input: PathBuf,
        output: PathBuf,
        spill_base: PathBuf,
    }

    impl FailureFixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let input = dir.path().join("input.txt");
            let output = dir.path().join("output.txt");
            let spill_base = dir.path().join("spills");
            fs::create_dir(&spill_base).unwrap();
            fs::write(&input, records(2000)).unwrap();
            fs::write(&output, "previous contents").unwrap();
            Self { dir, input, output, spill_base }
        }

        fn open(&self, sorter: &ExternalSorter) -> (ChunkReader<File>, Parser) {
            let file = File::open(&self.input).unwrap();
            let reader = ChunkReader::new(file, sorter.chunk_size, sorter.encoding.terminator());
            (reader, Parser::new(KeyDeriver::new(sorter.comparison), sorter.encoding))
        }

        fn assert_clean(&self) {
            assert_eq!(fs::read_to_string(&self.output).unwrap(), "previous contents");
            assert_eq!(fs::read_dir(&self.spill_base).unwrap().count(), 0);
            assert_eq!(fs::read_dir(self.dir.path()).unwrap().count(), 3);
        }
    }

    #[rstest]
    fn test_spill_write_failure_leaves_output_and_temp_dir_clean(
        #[values(0, 1, 4)] parallelism: usize,
    ) {
        let fixture = FailureFixture::new();
        let sorter = ExternalSorter::new().chunk_size(1024).parallelism(parallelism);
        let registry = SpillRegistry::new(Some(&fixture.spill_base)).unwrap();
        fs::remove_dir(registry.dir()).unwrap();
        let staged = StagedOutput::create(&fixture.output).unwrap();

        let (reader, parser) = fixture.open(&sorter);
        let stats = LineStats::default();
        let err = sorter.spill_phase(reader, parser, &stats, &registry).unwrap_err();
        assert!(matches!(err, SortError::Io(_)), "{err}");

        drop(staged);
        drop(registry);
        fixture.assert_clean();
    }

    #[rstest]
    #[case(0)]
    #[case(6)]
    fn test_corrupt_spill_during_merge_leaves_output_and_temp_dir_clean(#[case] level: u32) {
        let fixture = FailureFixture::new();
        let sorter = ExternalSorter::new().chunk_size(1024).parallelism(2).temp_compression(level);
        let registry = SpillRegistry::new(Some(&fixture.spill_base)).unwrap();
        let stats = LineStats::default();
        let (reader, parser) = fixture.open(&sorter);
        let summary = sorter.spill_phase(reader, parser, &stats, &registry).unwrap();

        let paths = registry.paths();
        assert!(paths.len() > 1);
        let bytes = fs::read(&paths[1]).unwrap();
        let cut = if level == 0 { bytes.len() - 1 } else { bytes.len() / 2 };
        fs::write(&paths[1], &bytes[..cut]).unwrap();

        let mut staged = StagedOutput::create(&fixture.output).unwrap();
        let err = sorter.merge_phase(&registry, summary, &stats, &mut staged).unwrap_err();
        assert!(matches!(err, SortError::Codec(_)), "{err}");

        drop(staged);
        drop(registry);
        fixture.assert_clean();
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, "1. a\n").unwrap();
        let output = dir.path().join("out.txt");
        assert!(ExternalSorter::new().chunk_size(10).sort(&input, &output).is_err());
        assert!(ExternalSorter::new().temp_compression(12).sort(&input, &output).is_err());
        assert!(!output.exists());
    }

    #[rstest]
    #[case("data.txt", "data.sorted.txt")]
    #[case("dir/records.csv", "dir/records.sorted.csv")]
    #[case("plain", "plain.sorted")]
    fn test_default_output_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(default_output_path(Path::new(input)), PathBuf::from(expected));
    }
}
