//! Custom error types for xsort operations.

use thiserror::Error;

/// Result type alias for xsort operations
pub type Result<T> = std::result::Result<T, SortError>;

/// Maximum number of characters of an offending line echoed back in an error.
const MAX_LINE_ECHO: usize = 80;

/// Error type for xsort operations
#[derive(Error, Debug)]
pub enum SortError {
    /// A line that does not match the `<id>. <text>` record format
    #[error("Malformed record '{line}': {reason}")]
    MalformedRecord {
        /// The offending line (lossily decoded, possibly truncated)
        line: String,
        /// Explanation of what is wrong with it
        reason: &'static str,
    },

    /// Underlying read/write failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt or truncated spill data, or a compression stream failure
    #[error("Spill codec error: {0}")]
    Codec(String),

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Text encoding label not recognized
    #[error("Unknown text encoding '{0}'")]
    UnknownEncoding(String),

    /// File-level problem (missing input, unusable output location)
    #[error("Invalid {description} '{path}': {reason}")]
    InvalidFile {
        /// Human-readable role of the file (e.g., "Input file")
        description: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A pipeline worker thread panicked
    #[error("Pipeline worker '{0}' panicked")]
    WorkerPanicked(&'static str),
}

impl SortError {
    /// Build a [`SortError::MalformedRecord`] from raw line bytes.
    #[must_use]
    pub fn malformed(line: &[u8], reason: &'static str) -> Self {
        let text = String::from_utf8_lossy(line);
        let line = if text.chars().count() > MAX_LINE_ECHO {
            let mut short: String = text.chars().take(MAX_LINE_ECHO).collect();
            short.push_str("...");
            short
        } else {
            text.into_owned()
        };
        SortError::MalformedRecord { line, reason }
    }

    /// Whether this error means the input does not conform to the record format.
    #[must_use]
    pub fn is_malformed_record(&self) -> bool {
        matches!(self, SortError::MalformedRecord { .. })
    }
}
