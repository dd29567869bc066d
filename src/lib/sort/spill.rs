//! Spill files: sorted chunks serialized to temporary storage.
//!
//! # Format
//!
//! A spill file is a sequence of records, optionally wrapped in one gzip stream:
//!
//! ```text
//! [line_len: i32 LE][line bytes][key_len: i32 LE][key bytes]
//! ```
//!
//! Lines are stored without their terminator. Raw files carry no header, so a
//! reader must be told whether the run wrote compressed spills.
//!
//! # Lifetime
//!
//! Every spill path is handed out by a [`SpillRegistry`], which owns the per-run
//! private temp directory. Dropping the registry deletes all registered files and
//! the directory, whether the run succeeded or not.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, warn};
use parking_lot::Mutex;
use tempfile::TempDir;

use super::parser::ParsedChunk;
use crate::errors::{Result, SortError};

/// Write buffer size for spill files.
const SPILL_WRITE_BUFFER: usize = 256 * 1024;

// ============================================================================
// Spill registry
// ============================================================================

/// Owner of the per-run temp directory and every spill file created in it.
pub struct SpillRegistry {
    dir: TempDir,
    paths: Mutex<Vec<PathBuf>>,
    next_id: AtomicUsize,
}

impl SpillRegistry {
    /// Create a private temp directory under `base` (or the system temp dir).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn new(base: Option<&Path>) -> Result<Self> {
        let dir = match base {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                tempfile::Builder::new().prefix("xsort-").tempdir_in(base)?
            }
            None => tempfile::Builder::new().prefix("xsort-").tempdir()?,
        };
        debug!("Spill directory: {}", dir.path().display());
        Ok(Self { dir, paths: Mutex::new(Vec::new()), next_id: AtomicUsize::new(0) })
    }

    /// Directory holding this run's spill files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Reserve and register the next spill path. The file is not created.
    pub fn next_path(&self) -> PathBuf {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.path().join(format!("chunk_{id:06}.spill"));
        self.paths.lock().push(path.clone());
        path
    }

    /// Registered paths in creation order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths = self.paths.lock().clone();
        paths.sort();
        paths
    }

    /// Number of registered spill files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    /// Whether no spill file has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.lock().is_empty()
    }

    /// Delete every registered spill file.
    pub fn remove_all(&self) {
        let paths = std::mem::take(&mut *self.paths.lock());
        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove spill file {}: {e}", path.display()),
            }
        }
    }
}

impl Drop for SpillRegistry {
    fn drop(&mut self) {
        self.remove_all();
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Spill output, raw or gzip-compressed.
enum SpillSink {
    Raw(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for SpillSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SpillSink::Raw(w) => w.write(buf),
            SpillSink::Gzip(w) => w.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            SpillSink::Raw(w) => w.write_all(buf),
            SpillSink::Gzip(w) => w.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            SpillSink::Raw(w) => w.flush(),
            SpillSink::Gzip(w) => w.flush(),
        }
    }
}

impl SpillSink {
    fn finish(self) -> io::Result<()> {
        let mut inner = match self {
            SpillSink::Raw(w) => w,
            SpillSink::Gzip(w) => w.finish()?,
        };
        inner.flush()
    }
}

/// Writer for one spill file.
pub struct SpillWriter {
    sink: SpillSink,
    records: u64,
}

impl SpillWriter {
    /// Create a spill file at `path`.
    ///
    /// `compression_level` 0 writes raw records; 1-9 wraps them in gzip.
    pub fn create(path: &Path, compression_level: u32) -> Result<Self> {
        let file = File::create(path)?;
        let buf = BufWriter::with_capacity(SPILL_WRITE_BUFFER, file);
        let sink = if compression_level == 0 {
            SpillSink::Raw(buf)
        } else {
            SpillSink::Gzip(GzEncoder::new(buf, Compression::new(compression_level.min(9))))
        };
        Ok(Self { sink, records: 0 })
    }

    /// Append one record.
    #[inline]
    pub fn write_record(&mut self, line: &[u8], key: &[u8]) -> Result<()> {
        self.sink.write_all(&encode_len(line.len())?)?;
        self.sink.write_all(line)?;
        self.sink.write_all(&encode_len(key.len())?)?;
        self.sink.write_all(key)?;
        self.records += 1;
        Ok(())
    }

    /// Finish the compressed stream (if any) and flush to disk.
    ///
    /// Returns the number of records written.
    pub fn finish(self) -> Result<u64> {
        self.sink.finish()?;
        Ok(self.records)
    }
}

fn encode_len(len: usize) -> Result<[u8; 4]> {
    i32::try_from(len)
        .map(i32::to_le_bytes)
        .map_err(|_| {
            SortError::Codec(format!("record field of {len} bytes exceeds spill format limit"))
        })
}

/// Write a sorted chunk to `path` in entry order.
///
/// Returns the number of records written.
pub fn write_spill(chunk: &ParsedChunk, path: &Path, compression_level: u32) -> Result<u64> {
    let mut writer = SpillWriter::create(path, compression_level)?;
    for (line, key) in chunk.records() {
        writer.write_record(line, key)?;
    }
    writer.finish()
}

// ============================================================================
// Reading
// ============================================================================

/// Spill input, raw or gzip-compressed.
enum SpillSource {
    Raw(BufReader<File>),
    Gzip(GzDecoder<BufReader<File>>),
}

impl SpillSource {
    fn is_compressed(&self) -> bool {
        matches!(self, SpillSource::Gzip(_))
    }
}

impl Read for SpillSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SpillSource::Raw(r) => r.read(buf),
            SpillSource::Gzip(r) => r.read(buf),
        }
    }
}

/// Sequential reader over one spill file, exposing the current record.
pub struct MergeCursor {
    source: SpillSource,
    path: PathBuf,
    line: Vec<u8>,
    key: Vec<u8>,
    records: u64,
}

impl MergeCursor {
    /// Open the spill file at `path` with a read buffer of `buffer_size` bytes.
    ///
    /// `compressed` must match how the file was written. No record is loaded
    /// until [`MergeCursor::advance`] is called.
    pub fn open(path: &Path, buffer_size: usize, compressed: bool) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(buffer_size, file);
        let source = if compressed {
            SpillSource::Gzip(GzDecoder::new(reader))
        } else {
            SpillSource::Raw(reader)
        };
        Ok(Self { source, path: path.to_path_buf(), line: Vec::new(), key: Vec::new(), records: 0 })
    }

    /// Path of the spill file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Line bytes of the current record.
    #[inline]
    #[must_use]
    pub fn line(&self) -> &[u8] {
        &self.line
    }

    /// Key bytes of the current record.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Records decoded so far.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Load the next record. Returns `false` at a clean end of file.
    ///
    /// # Errors
    ///
    /// Returns [`SortError::Codec`] for a truncated or corrupt file and
    /// [`SortError::Io`] for other read failures.
    pub fn advance(&mut self) -> Result<bool> {
        let Some(line_len) = self.read_len(true)? else {
            return Ok(false);
        };
        self.read_field(line_len, FieldKind::Line)?;
        let key_len = self.read_len(false)?.unwrap_or_default();
        self.read_field(key_len, FieldKind::Key)?;
        self.records += 1;
        Ok(true)
    }

    /// Read a length prefix. `None` means end of file at a record boundary.
    fn read_len(&mut self, at_boundary: bool) -> Result<Option<usize>> {
        let mut buf = [0u8; 4];
        let filled = read_full(&mut self.source, &mut buf).map_err(|e| self.map_read_error(e))?;
        if filled == 0 && at_boundary {
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(self.corrupt("truncated length prefix"));
        }
        let len = i32::from_le_bytes(buf);
        usize::try_from(len).map(Some).map_err(|_| self.corrupt("negative length prefix"))
    }

    fn read_field(&mut self, len: usize, kind: FieldKind) -> Result<()> {
        let mut field = std::mem::take(match kind {
            FieldKind::Line => &mut self.line,
            FieldKind::Key => &mut self.key,
        });
        field.resize(len, 0);
        let filled = read_full(&mut self.source, &mut field).map_err(|e| self.map_read_error(e))?;
        let truncated = filled < len;
        match kind {
            FieldKind::Line => self.line = field,
            FieldKind::Key => self.key = field,
        }
        if truncated {
            return Err(self.corrupt(match kind {
                FieldKind::Line => "truncated line",
                FieldKind::Key => "truncated key",
            }));
        }
        Ok(())
    }

    fn corrupt(&self, what: &str) -> SortError {
        let path = self.path.display();
        SortError::Codec(format!("{what} in {path} after {} records", self.records))
    }

    fn map_read_error(&self, e: io::Error) -> SortError {
        let codec_failure = matches!(
            e.kind(),
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof
        );
        if self.source.is_compressed() && codec_failure {
            SortError::Codec(format!("gzip stream in {}: {e}", self.path.display()))
        } else {
            SortError::Io(e)
        }
    }
}

#[derive(Clone, Copy)]
enum FieldKind {
    Line,
    Key,
}

/// Read until `buf` is full or the reader is exhausted, returning the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
