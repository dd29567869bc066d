//! Random `<id>. <text>` record generation for test and benchmark inputs.

use std::io::Write;

use rand::Rng;

use crate::errors::Result;
use crate::progress::ProgressTracker;
use crate::validation::validate_min_max;

const TEXT_CHARACTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default number of records to generate.
pub const DEFAULT_COUNT: u64 = 10_000_000;
/// Default minimum text length.
pub const DEFAULT_MIN_LENGTH: usize = 16;
/// Default maximum text length (exclusive).
pub const DEFAULT_MAX_LENGTH: usize = 256;

/// Shape of the generated records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Number of records.
    pub count: u64,
    /// Minimum text length in characters.
    pub min_length: usize,
    /// Text length upper bound, exclusive.
    pub max_length: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

/// Write `options.count` random records to `out`, one per line.
///
/// Ids are uniform non-negative 32-bit integers. Text is alphanumeric, with a
/// one-in-eight chance of a space at every position except the first and last.
///
/// # Errors
///
/// Returns an error if `max_length <= min_length` or writing fails.
pub fn generate_records<W: Write, R: Rng + ?Sized>(
    out: &mut W,
    options: &GenerateOptions,
    rng: &mut R,
) -> Result<u64> {
    validate_min_max(options.min_length, options.max_length, "min-length", "max-length")?;

    let progress = ProgressTracker::new("Generated records");
    let mut line = Vec::with_capacity(options.max_length + 16);
    for _ in 0..options.count {
        line.clear();
        let id = rng.random_range(0..u32::MAX >> 1);
        write!(line, "{id}. ")?;

        let length = rng.random_range(options.min_length..options.max_length);
        for j in 0..length {
            if j > 0 && j + 1 < length && rng.random_range(0..8) == 0 {
                line.push(b' ');
            } else {
                line.push(TEXT_CHARACTERS[rng.random_range(0..TEXT_CHARACTERS.len())]);
            }
        }
        line.push(b'\n');
        out.write_all(&line)?;
        progress.record(1);
    }
    out.flush()?;
    progress.log_final();
    Ok(progress.count())
}
