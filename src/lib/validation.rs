//! Input validation utilities
//!
//! Common checks for command-line parameters and file paths, reported through
//! [`crate::errors::SortError`] so messages are consistent across subcommands.

use crate::errors::{Result, SortError};
use std::fmt::Display;
use std::path::Path;

/// Smallest chunk size accepted by the sorter.
///
/// Smaller values work (the reader grows its buffer for long lines) but create
/// an unreasonable number of spill files.
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Validate that a file exists and is a regular file
///
/// # Errors
/// Returns an error if the path does not exist or is a directory
///
/// # Example
/// ```
/// use xsort_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/records.txt", "Input file");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(invalid_file(path_ref, description, "File does not exist"));
    }
    if path_ref.is_dir() {
        return Err(invalid_file(path_ref, description, "Path is a directory"));
    }
    Ok(())
}

/// Validate that the directory an output file will be created in exists
///
/// # Errors
/// Returns an error if the parent directory is missing or the path is a directory
pub fn validate_output_location<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if path_ref.is_dir() {
        return Err(invalid_file(path_ref, description, "Path is a directory"));
    }
    match path_ref.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => Err(invalid_file(
            path_ref,
            description,
            "Parent directory does not exist",
        )),
        _ => Ok(()),
    }
}

/// Validate the chunk size used to split the input
///
/// # Errors
/// Returns an error if `chunk_size` is below [`MIN_CHUNK_SIZE`]
///
/// # Example
/// ```
/// use xsort_lib::validation::validate_chunk_size;
///
/// validate_chunk_size(64 * 1024 * 1024).unwrap();
/// assert!(validate_chunk_size(10).is_err());
/// ```
pub fn validate_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size < MIN_CHUNK_SIZE {
        return Err(SortError::InvalidParameter {
            parameter: "chunk-size".to_string(),
            reason: format!("Must be at least {MIN_CHUNK_SIZE} bytes, got: {chunk_size}"),
        });
    }
    Ok(())
}

/// Validate a gzip compression level for spill files (0 disables compression)
///
/// # Errors
/// Returns an error if `level` is greater than 9
pub fn validate_compression_level(level: u32) -> Result<()> {
    if level > 9 {
        return Err(SortError::InvalidParameter {
            parameter: "temp-compression".to_string(),
            reason: format!("Must be between 0 and 9, got: {level}"),
        });
    }
    Ok(())
}

/// Validate that max is strictly greater than min
///
/// # Errors
/// Returns an error if `max_val <= min_val`
///
/// # Example
/// ```
/// use xsort_lib::validation::validate_min_max;
///
/// validate_min_max(16, 256, "min-length", "max-length").unwrap();
/// assert!(validate_min_max(10, 10, "min-length", "max-length").is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_min_max<T: Ord + Display>(
    min_val: T,
    max_val: T,
    min_name: &str,
    max_name: &str,
) -> Result<()> {
    if max_val <= min_val {
        return Err(SortError::InvalidParameter {
            parameter: max_name.to_string(),
            reason: format!("{max_name} ({max_val}) must be > {min_name} ({min_val})"),
        });
    }
    Ok(())
}

fn invalid_file(path: &Path, description: &str, reason: &str) -> SortError {
    SortError::InvalidFile {
        description: description.to_string(),
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
