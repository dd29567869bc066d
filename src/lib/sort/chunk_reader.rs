//! Line-aligned chunked reading of the input stream.
//!
//! Each chunk ends just past a line terminator; the partial line after the last
//! terminator is carried to the front of the next chunk. A line longer than the
//! chunk size grows that one chunk instead of failing.

use std::io::{self, Read};

use log::debug;

use super::encoding::LineTerminator;
use crate::logging::format_bytes;

/// Reads an input stream in line-aligned chunks of roughly `chunk_size` bytes.
pub struct ChunkReader<R> {
    reader: R,
    chunk_size: usize,
    terminator: LineTerminator,
    carry: Vec<u8>,
    bom: &'static [u8],
    bom_checked: bool,
    bom_found: bool,
    eof: bool,
    bytes_read: u64,
}

impl<R: Read> ChunkReader<R> {
    /// Create a reader producing chunks of at most `chunk_size` bytes (unless a
    /// single line is longer).
    pub fn new(reader: R, chunk_size: usize, terminator: LineTerminator) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            terminator,
            carry: Vec::new(),
            bom: &[],
            bom_checked: false,
            bom_found: false,
            eof: false,
            bytes_read: 0,
        }
    }

    /// Strip `bom` if the stream starts with it.
    #[must_use]
    pub fn skip_bom(mut self, bom: &'static [u8]) -> Self {
        self.bom = bom;
        self
    }

    /// Whether a byte order mark was stripped from the start of the stream.
    #[must_use]
    pub fn bom_found(&self) -> bool {
        self.bom_found
    }

    /// Total bytes consumed from the underlying stream.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Replace the contents of `buffer` with the next chunk.
    ///
    /// Returns the number of valid bytes (always `buffer.len()`) and whether the
    /// stream is exhausted. At end of stream the remainder is returned even if it
    /// lacks a final terminator; a zero-length chunk may accompany the end flag.
    ///
    /// # Errors
    ///
    /// Propagates read errors from the underlying stream.
    pub fn read_chunk(&mut self, buffer: &mut Vec<u8>) -> io::Result<(usize, bool)> {
        buffer.clear();
        buffer.append(&mut self.carry);
        if self.eof {
            return Ok((buffer.len(), true));
        }

        let mut limit = self.chunk_size;
        loop {
            self.fill(buffer, limit)?;
            if !self.bom_checked {
                self.strip_bom(buffer);
            }
            if self.eof {
                return Ok((buffer.len(), true));
            }

            if let Some(pos) = self.terminator.rfind(buffer) {
                let end = pos + self.terminator.len();
                self.carry.extend_from_slice(&buffer[end..]);
                buffer.truncate(end);
                return Ok((end, false));
            }

            limit = limit.saturating_mul(2);
            debug!(
                "No line terminator within chunk, growing read buffer to {}",
                format_bytes(limit as u64)
            );
        }
    }

    /// Read until `buffer` holds `limit` bytes or the stream ends.
    fn fill(&mut self, buffer: &mut Vec<u8>, limit: usize) -> io::Result<()> {
        let wanted = limit.saturating_sub(buffer.len());
        if wanted == 0 {
            return Ok(());
        }
        let n = Read::by_ref(&mut self.reader).take(wanted as u64).read_to_end(buffer)?;
        self.bytes_read += n as u64;
        if n < wanted {
            self.eof = true;
        }
        Ok(())
    }

    fn strip_bom(&mut self, buffer: &mut Vec<u8>) {
        let n = buffer.len().min(self.bom.len());
        if n < self.bom.len() && !self.eof && self.bom.starts_with(&buffer[..n]) {
            return;
        }
        self.bom_checked = true;
        if !self.bom.is_empty() && buffer.starts_with(self.bom) {
            buffer.drain(..self.bom.len());
            self.bom_found = true;
        }
    }
}
