//! Generate random record files for testing and benchmarking.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use xsort_lib::generate::{
    DEFAULT_COUNT, DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH, GenerateOptions, generate_records,
};
use xsort_lib::logging::OperationTimer;
use xsort_lib::validation::validate_output_location;

use crate::commands::command::Command;

const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

/// Write a file of random `<id>. <text>` records.
#[derive(Debug, Parser)]
#[command(
    name = "generate",
    about = "\x1b[36mGenerate a file of random `<id>. <text>` records\x1b[0m",
    long_about = r#"
Generate a file of random `<id>. <text>` records.

Ids are random non-negative integers. Text is random alphanumeric characters
with occasional inner spaces, between --min-length (inclusive) and
--max-length (exclusive) characters long.

EXAMPLES:

  # Ten million records (about 1.4 GB)
  xsort generate -o records.txt

  # Small reproducible file
  xsort generate -o small.txt --count 1000 --seed 42
"#
)]
pub struct Generate {
    /// Output file.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Number of records to write.
    #[arg(short = 'n', long = "count", default_value_t = DEFAULT_COUNT)]
    pub count: u64,

    /// Minimum text length.
    #[arg(long = "min-length", default_value_t = DEFAULT_MIN_LENGTH)]
    pub min_length: usize,

    /// Maximum text length (exclusive).
    #[arg(long = "max-length", default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    /// Random seed for reproducible output.
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl Command for Generate {
    fn execute(&self, command_line: &str) -> Result<()> {
        validate_output_location(&self.output, "Output file")?;
        info!("Command line: {command_line}");

        let options = GenerateOptions {
            count: self.count,
            min_length: self.min_length,
            max_length: self.max_length,
        };
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let timer = OperationTimer::new("Generating records");
        let file = File::create(&self.output)
            .with_context(|| format!("Failed to create {}", self.output.display()))?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        let written = generate_records(&mut writer, &options, &mut rng)?;

        info!("Wrote {} records to {}", written, self.output.display());
        timer.log_completion(written);
        Ok(())
    }
}
