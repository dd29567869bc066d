//! Sort `<id>. <text>` record files.
//!
//! Uses an external merge sort: the input is split into chunks that are
//! sorted in memory and spilled to temporary files, which are then merged.
//! Inputs that fit in one chunk are sorted entirely in memory.
//!
//! # Verification
//!
//! Use `--verify` to check if a file is correctly sorted without writing output.

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use xsort_lib::logging::{OperationTimer, format_bytes, format_count};
use xsort_lib::sort::{ExternalSorter, default_output_path, verify_sorted};
use xsort_lib::validation::{validate_file_exists, validate_output_location};

use crate::commands::command::Command;
use crate::commands::common::{AlgorithmArg, TextOptions, parse_memory};

/// Sort a record file.
#[derive(Debug, Parser)]
#[command(
    name = "sort",
    about = "\x1b[36mSort a file of `<id>. <text>` records by text, then id\x1b[0m",
    long_about = r#"
Sort a file of `<id>. <text>` records using an external merge sort.

Records are ordered by their text under the selected comparison mode; records
with equal text are ordered by ascending numeric id. Files larger than the
chunk size are sorted in chunks that are spilled to temporary files and merged.

COMPARISON MODES:

  ordinal               Code point order (fastest)
  ordinal-ignore-case   Code point order after uppercasing
  invariant             Linguistic order: letters before accents before case
  invariant-ignore-case Linguistic order, ignoring case
  culture               Linguistic order for the process locale
  culture-ignore-case   Linguistic order for the process locale, ignoring case

EXAMPLES:

  # Sort with defaults (writes records.sorted.txt)
  xsort sort -i records.txt

  # Large file with 8 workers, 1G chunks and compressed temp files
  xsort sort -i records.txt -o sorted.txt --threads 8 --chunk-size 1G \
    --temp-compression 1

  # Verify a file is correctly sorted
  xsort sort -i sorted.txt --verify --comparison invariant
"#
)]
pub struct Sort {
    /// Input record file.
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output file (defaults to `<input-stem>.sorted.<ext>` next to the input).
    #[arg(short = 'o', long = "output", conflicts_with = "verify")]
    pub output: Option<PathBuf>,

    /// Verify the input file is correctly sorted (no output written).
    ///
    /// Reads records sequentially and checks that each record's sort key
    /// is >= the previous record's key. Exits 0 if sorted correctly,
    /// non-zero if any records are out of order.
    #[arg(long = "verify", conflicts_with = "output")]
    pub verify: bool,

    /// How record text is decoded and compared.
    #[command(flatten)]
    pub text: TextOptions,

    /// Input bytes sorted in memory at a time.
    ///
    /// Accepts values like "512M", "1G" or a plain byte count. Peak memory is
    /// roughly this times the number of chunks in flight.
    #[arg(short = 'm', long = "chunk-size", default_value = "100M", value_parser = parse_memory)]
    pub chunk_size: usize,

    /// Number of parser and sorter workers (0 = serial).
    #[arg(short = 't', long = "threads", default_value = "0")]
    pub threads: usize,

    /// In-memory sort algorithm for each chunk.
    #[arg(long = "algorithm", value_enum, default_value = "radix-quick")]
    pub algorithm: AlgorithmArg,

    /// Temporary directory for intermediate files.
    ///
    /// If not specified, uses the system default temp directory.
    #[arg(short = 'T', long = "tmp-dir")]
    pub tmp_dir: Option<PathBuf>,

    /// Compression level for temporary chunk files (0-9).
    ///
    /// Level 0 (default) disables compression. Level 1 gives fast
    /// compression with reasonable space savings.
    #[arg(
        long = "temp-compression",
        default_value = "0",
        value_parser = clap::value_parser!(u32).range(0..=9)
    )]
    pub temp_compression: u32,
}

impl Command for Sort {
    fn execute(&self, command_line: &str) -> Result<()> {
        validate_file_exists(&self.input, "Input file")?;
        info!("Command line: {command_line}");

        if self.verify {
            return self.execute_verify();
        }

        self.execute_sort()
    }
}

impl Sort {
    /// Resolved output path.
    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| default_output_path(&self.input))
    }

    /// Execute sort mode: read, sort, and write output.
    fn execute_sort(&self) -> Result<()> {
        let output = self.output_path();
        validate_output_location(&output, "Output file")?;
        if self.chunk_size == 0 {
            bail!("--chunk-size must be greater than 0");
        }

        info!("Starting Sort");
        info!("Input: {}", self.input.display());
        info!("Output: {}", output.display());
        if let Some(ref tmp) = self.tmp_dir {
            info!("Temp directory: {}", tmp.display());
        }
        info!("Temp compression level: {}", self.temp_compression);

        let mut sorter = ExternalSorter::new()
            .chunk_size(self.chunk_size)
            .parallelism(self.threads)
            .comparison(self.text.mode())
            .encoding(self.text.text_encoding()?)
            .algorithm(self.algorithm.into())
            .temp_compression(self.temp_compression);
        if let Some(ref tmp) = self.tmp_dir {
            sorter = sorter.temp_dir(tmp.clone());
        }

        let stats = sorter
            .sort(&self.input, &output)
            .with_context(|| format!("Failed to sort {}", self.input.display()))?;

        // Summary
        info!("=== Summary ===");
        info!("Records processed: {}", format_count(stats.total_records));
        info!("Records written: {}", format_count(stats.output_records));
        info!("Bytes read: {}", format_bytes(stats.bytes_read));
        if stats.chunks_written > 0 {
            info!("Temporary chunks: {}", stats.chunks_written);
        }
        info!("Output: {}", output.display());
        Ok(())
    }

    /// Execute verify mode: read records and check sort order.
    fn execute_verify(&self) -> Result<()> {
        let timer = OperationTimer::new("Verifying sort order");
        let mode = self.text.mode();

        info!("Starting Sort Verification");
        info!("Input: {}", self.input.display());
        info!("Expected order: {mode}");

        let report = verify_sorted(&self.input, mode, self.text.text_encoding()?)
            .with_context(|| format!("Failed to verify {}", self.input.display()))?;

        info!("=== Verification Summary ===");
        info!("Records checked: {}", format_count(report.records));
        info!("Sort order violations: {}", format_count(report.violations));
        timer.log_completion(report.records);

        if let Some((record_num, line)) = &report.first_violation {
            info!("First violation at record {record_num}: {line}");
            bail!("File is NOT correctly sorted by {mode}: {} violations found", report.violations);
        }

        info!("Result: PASS - file is correctly sorted by {mode}");
        Ok(())
    }
}
