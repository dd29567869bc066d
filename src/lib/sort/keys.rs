//! Record parsing and composite sort keys.
//!
//! A record line has the form `<id>. <text>`. Its sort key is the collation key
//! of `<text>` followed by `<id>` as a big-endian `u64`:
//!
//! ```text
//! [collation key (self-terminating)][id: u64 BE]
//! ```
//!
//! Comparing keys bytewise therefore orders records by text under the chosen
//! [`ComparisonMode`] and breaks ties by ascending id. Keys derived under
//! different modes must never be compared with each other.

use std::cmp::Ordering;

use log::info;

use super::collation::{CollateFn, ComparisonMode, process_locale};
use crate::errors::{Result, SortError};

/// Width of the id suffix appended to every key.
pub const ID_SUFFIX_LEN: usize = 8;

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Numeric prefix before the delimiter.
    pub id: u64,
    /// Everything after the `". "` delimiter.
    pub text: &'a str,
}

#[inline]
fn is_separator(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// Parse a `<id>. <text>` line (without its line terminator).
///
/// The id is the non-empty run of ASCII digits before the first `.`, which must
/// be followed by a space or tab. The text starts after that one separator.
///
/// # Errors
///
/// Returns [`SortError::MalformedRecord`] when the delimiter is missing or the
/// id is not a non-negative integer that fits in a `u64`.
pub fn parse_record(line: &str) -> Result<Record<'_>> {
    let bytes = line.as_bytes();
    let Some(dot) = memchr::memchr(b'.', bytes) else {
        return Err(SortError::malformed(bytes, "missing '. ' delimiter"));
    };
    if !bytes.get(dot + 1).copied().is_some_and(is_separator) {
        return Err(SortError::malformed(bytes, "missing '. ' delimiter"));
    }

    let digits = &line[..dot];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SortError::malformed(bytes, "id is not a non-negative integer"));
    }
    let id = digits
        .parse::<u64>()
        .map_err(|_| SortError::malformed(bytes, "id does not fit in 64 bits"))?;

    Ok(Record { id, text: &line[dot + 2..] })
}

/// Derives sort keys for one comparison mode.
///
/// The mode is resolved to its collation function once, at construction.
#[derive(Clone, Copy)]
pub struct KeyDeriver {
    mode: ComparisonMode,
    collate: CollateFn,
}

impl std::fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDeriver").field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl KeyDeriver {
    /// Create a key deriver for `mode`.
    #[must_use]
    pub fn new(mode: ComparisonMode) -> Self {
        if mode.is_culture_sensitive() {
            info!("Collating with locale '{}' using root collation weights", process_locale());
        }
        Self { mode, collate: mode.collator() }
    }

    /// The comparison mode keys are derived under.
    #[must_use]
    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    /// Append the key of `record` to `out`.
    #[inline]
    pub fn append_key(&self, record: Record<'_>, out: &mut Vec<u8>) {
        (self.collate)(record.text, out);
        out.extend_from_slice(&record.id.to_be_bytes());
    }

    /// Parse `line` and append its key to `out`, returning the parsed id.
    ///
    /// On error nothing is appended.
    pub fn derive_key(&self, line: &str, out: &mut Vec<u8>) -> Result<u64> {
        let record = parse_record(line)?;
        self.append_key(record, out);
        Ok(record.id)
    }

    /// Derive the key of `line` into a fresh vector.
    pub fn key_of(&self, line: &str) -> Result<Vec<u8>> {
        let mut key = Vec::with_capacity(line.len() * 2 + ID_SUFFIX_LEN);
        self.derive_key(line, &mut key)?;
        Ok(key)
    }
}

/// Compare two keys derived under the same mode.
#[inline]
#[must_use]
pub fn compare_keys(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}
