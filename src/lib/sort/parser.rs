//! Splitting raw chunks into records and deriving their sort keys.
//!
//! A parsed chunk owns two arenas: the raw chunk bytes (lines are slices of it)
//! and a key arena holding every derived key back to back. [`Entry`] values are
//! plain offsets into both, so sorting a chunk only moves small `Copy` items.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::encoding::{LineTerminator, TextEncoding};
use super::keys::KeyDeriver;
use crate::errors::{Result, SortError};

/// Offsets of one record's line and key within a [`ParsedChunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    line_start: usize,
    line_end: usize,
    key_start: usize,
    key_end: usize,
}

impl Entry {
    /// This entry's key within a key arena.
    #[inline]
    #[must_use]
    pub fn key_in<'k>(&self, keys: &'k [u8]) -> &'k [u8] {
        &keys[self.key_start..self.key_end]
    }

    /// This entry's line within a raw chunk.
    #[inline]
    #[must_use]
    pub fn line_in<'r>(&self, raw: &'r [u8]) -> &'r [u8] {
        &raw[self.line_start..self.line_end]
    }
}

/// A chunk of records with their derived keys.
#[derive(Debug, Default)]
pub struct ParsedChunk {
    /// The raw chunk bytes, including line terminators.
    pub raw: Vec<u8>,
    /// All derived keys, back to back.
    pub keys: Vec<u8>,
    /// One entry per record, in input order until sorted.
    pub entries: Vec<Entry>,
}

impl ParsedChunk {
    /// Line bytes of `entry`, without the terminator.
    #[inline]
    #[must_use]
    pub fn line(&self, entry: &Entry) -> &[u8] {
        entry.line_in(&self.raw)
    }

    /// Key bytes of `entry`.
    #[inline]
    #[must_use]
    pub fn key(&self, entry: &Entry) -> &[u8] {
        entry.key_in(&self.keys)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chunk holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(line, key)` pairs in entry order.
    pub fn records(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.entries.iter().map(move |e| (self.line(e), self.key(e)))
    }

    /// Give back the two arenas for recycling.
    #[must_use]
    pub fn into_buffers(self) -> (Vec<u8>, Vec<u8>) {
        (self.raw, self.keys)
    }
}

/// Per-run maxima of line and key lengths, shared by all parser workers.
///
/// The merge phase sizes its per-file read buffers from these.
#[derive(Debug, Default)]
pub struct LineStats {
    max_line: AtomicUsize,
    max_key: AtomicUsize,
    records: AtomicU64,
}

impl LineStats {
    /// Smallest per-cursor read buffer used by the merge phase.
    pub const MIN_MERGE_BUFFER: usize = 64 * 1024;

    /// Record the maxima and record count of one parsed chunk.
    pub fn observe(&self, max_line: usize, max_key: usize, records: u64) {
        self.max_line.fetch_max(max_line, Ordering::Relaxed);
        self.max_key.fetch_max(max_key, Ordering::Relaxed);
        self.records.fetch_add(records, Ordering::Relaxed);
    }

    /// Longest line seen so far, in bytes.
    #[must_use]
    pub fn max_line_len(&self) -> usize {
        self.max_line.load(Ordering::Relaxed)
    }

    /// Longest key seen so far, in bytes.
    #[must_use]
    pub fn max_key_len(&self) -> usize {
        self.max_key.load(Ordering::Relaxed)
    }

    /// Records parsed so far.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Read buffer size for one merge cursor: room for two full spill records.
    #[must_use]
    pub fn merge_buffer_size(&self) -> usize {
        let record = self.max_line_len() + self.max_key_len() + 2 * 4;
        (2 * record).max(Self::MIN_MERGE_BUFFER)
    }
}

/// Turns raw chunk bytes into a [`ParsedChunk`].
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    deriver: KeyDeriver,
    encoding: TextEncoding,
    terminator: LineTerminator,
}

impl Parser {
    /// Create a parser for text in `encoding`, deriving keys with `deriver`.
    #[must_use]
    pub fn new(deriver: KeyDeriver, encoding: TextEncoding) -> Self {
        Self { deriver, encoding, terminator: encoding.terminator() }
    }

    /// Parse every line of `raw`, appending keys to `keys` (which is cleared first).
    ///
    /// # Errors
    ///
    /// Returns [`SortError::MalformedRecord`] for the first line that is not a
    /// `<id>. <text>` record.
    pub fn parse(&self, raw: Vec<u8>, mut keys: Vec<u8>, stats: &LineStats) -> Result<ParsedChunk> {
        keys.clear();
        let mut entries = Vec::with_capacity(raw.len() / 32);
        let mut max_line = 0;
        let mut max_key = 0;

        let mut offset = 0;
        for line in self.terminator.lines(&raw) {
            let line_start = offset;
            let line_end = line_start + line.len();
            offset = line_end + self.terminator.len();

            let text = self.encoding.decode_line(line);
            let key_start = keys.len();
            self.deriver.derive_key(&text, &mut keys).map_err(|e| match e {
                SortError::MalformedRecord { reason, .. } => SortError::malformed(line, reason),
                other => other,
            })?;
            let key_end = keys.len();

            max_line = max_line.max(line.len());
            max_key = max_key.max(key_end - key_start);
            entries.push(Entry { line_start, line_end, key_start, key_end });
        }

        stats.observe(max_line, max_key, entries.len() as u64);
        Ok(ParsedChunk { raw, keys, entries })
    }
}
