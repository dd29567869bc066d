//! Split-sort phase: read, parse, sort and spill every chunk of the input.
//!
//! With a parallelism of zero everything runs in one loop on the calling
//! thread, reusing one pair of buffers. Otherwise the stages run on scoped
//! threads connected by bounded channels:
//!
//! ```text
//!   reader ──► parsers (N) ──► sorters (N) ──► writers (⌈N/2⌉)
//! ```
//!
//! Full channels block their producers, so at most a handful of chunks are in
//! flight at once. Chunks complete in any order. The first failure is stored,
//! an abort flag stops every stage at its next hand-off, and channels close as
//! the workers exit; the error then surfaces from [`SpillPipeline::run`].

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, error};
use parking_lot::Mutex;

use super::buffer_pool::BufferPool;
use super::chunk_reader::ChunkReader;
use super::chunk_sorter::{SortAlgorithm, sort_chunk};
use super::parser::{LineStats, ParsedChunk, Parser};
use super::spill::{SpillRegistry, write_spill};
use crate::errors::{Result, SortError};
use crate::logging::{format_bytes, format_count};

/// What the reader learned about the input while splitting it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    /// Bytes consumed from the input stream.
    pub bytes_read: u64,
    /// Whether a byte order mark was stripped from the input.
    pub bom_found: bool,
}

/// First-error slot and abort flag shared by all pipeline workers.
#[derive(Default)]
struct Shared {
    abort: AtomicBool,
    error: Mutex<Option<SortError>>,
}

impl Shared {
    fn aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    fn fail(&self, stage: &str, err: SortError) {
        error!("{stage} failed: {err}");
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
        self.abort.store(true, Ordering::Release);
    }

    fn take_error(&self) -> Option<SortError> {
        self.error.lock().take()
    }
}

/// The split-sort phase, configured for one run.
pub struct SpillPipeline<'a> {
    /// Line splitter and key deriver.
    pub parser: Parser,
    /// In-memory algorithm for each chunk.
    pub algorithm: SortAlgorithm,
    /// Number of parser and sorter workers; 0 runs serially.
    pub parallelism: usize,
    /// Spill compression level, 0 for uncompressed.
    pub compression_level: u32,
    /// Where spill files are created and tracked.
    pub registry: &'a SpillRegistry,
    /// Per-run line and key maxima.
    pub stats: &'a LineStats,
    /// Chunk and key buffers.
    pub pool: &'a BufferPool,
}

impl SpillPipeline<'_> {
    /// Split `reader` into sorted spill files registered with the registry.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any stage: read failures, malformed
    /// records, spill write failures, or [`SortError::WorkerPanicked`].
    pub fn run<R: Read + Send>(&self, reader: ChunkReader<R>) -> Result<ReadSummary> {
        if self.parallelism == 0 { self.run_serial(reader) } else { self.run_parallel(reader) }
    }

    fn run_serial<R: Read>(&self, mut reader: ChunkReader<R>) -> Result<ReadSummary> {
        let mut raw = self.pool.rent();
        let mut keys = self.pool.rent();
        loop {
            let (n, end) = reader.read_chunk(&mut raw)?;
            if n > 0 {
                let mut chunk = self.parser.parse(raw, keys, self.stats)?;
                sort_chunk(&mut chunk, self.algorithm, false);
                self.spill(&chunk)?;
                (raw, keys) = chunk.into_buffers();
            }
            if end {
                break;
            }
        }
        self.pool.recycle(raw);
        self.pool.recycle(keys);
        Ok(ReadSummary { bytes_read: reader.bytes_read(), bom_found: reader.bom_found() })
    }

    fn run_parallel<R: Read + Send>(&self, reader: ChunkReader<R>) -> Result<ReadSummary> {
        let workers = self.parallelism;
        let writers = workers.div_ceil(2);
        let shared = Shared::default();

        let (raw_tx, raw_rx) = bounded::<Vec<u8>>(workers);
        let (parsed_tx, parsed_rx) = bounded::<ParsedChunk>(workers);
        let (sorted_tx, sorted_rx) = bounded::<ParsedChunk>(writers);

        let summary = thread::scope(|scope| {
            let shared = &shared;

            let reader_handle = scope.spawn(move || self.read_stage(reader, &raw_tx, shared));

            let mut handles = Vec::with_capacity(2 * workers + writers);
            for _ in 0..workers {
                let (rx, tx) = (raw_rx.clone(), parsed_tx.clone());
                handles.push(("parser", scope.spawn(move || self.parse_stage(&rx, &tx, shared))));
            }
            for _ in 0..workers {
                let (rx, tx) = (parsed_rx.clone(), sorted_tx.clone());
                handles.push(("sorter", scope.spawn(move || self.sort_stage(&rx, &tx, shared))));
            }
            for _ in 0..writers {
                let rx = sorted_rx.clone();
                handles.push(("writer", scope.spawn(move || self.write_stage(&rx, shared))));
            }
            // Only the workers hold channel ends from here on.
            drop((raw_rx, parsed_tx, parsed_rx, sorted_tx, sorted_rx));

            let summary = reader_handle.join().unwrap_or_else(|_| {
                shared.fail("reader", SortError::WorkerPanicked("reader"));
                ReadSummary::default()
            });
            for (stage, handle) in handles {
                if handle.join().is_err() {
                    shared.fail(stage, SortError::WorkerPanicked(stage));
                }
            }
            summary
        });

        match shared.take_error() {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    /// Read chunks into pooled buffers until the input ends or the run aborts.
    #[allow(clippy::needless_pass_by_value)]
    fn read_stage<R: Read>(
        &self,
        mut reader: ChunkReader<R>,
        tx: &Sender<Vec<u8>>,
        shared: &Shared,
    ) -> ReadSummary {
        while !shared.aborted() {
            let mut raw = self.pool.rent();
            match reader.read_chunk(&mut raw) {
                Ok((n, end)) => {
                    if n > 0 {
                        debug!("Read chunk of {}", format_bytes(n as u64));
                        if tx.send(raw).is_err() {
                            break;
                        }
                    } else {
                        self.pool.recycle(raw);
                    }
                    if end {
                        break;
                    }
                }
                Err(e) => {
                    self.pool.recycle(raw);
                    shared.fail("reader", e.into());
                    break;
                }
            }
        }
        ReadSummary { bytes_read: reader.bytes_read(), bom_found: reader.bom_found() }
    }

    fn parse_stage(&self, rx: &Receiver<Vec<u8>>, tx: &Sender<ParsedChunk>, shared: &Shared) {
        for raw in rx {
            if shared.aborted() {
                self.pool.recycle(raw);
                break;
            }
            match self.parser.parse(raw, self.pool.rent(), self.stats) {
                Ok(chunk) => {
                    if tx.send(chunk).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    shared.fail("parser", e);
                    break;
                }
            }
        }
    }

    fn sort_stage(&self, rx: &Receiver<ParsedChunk>, tx: &Sender<ParsedChunk>, shared: &Shared) {
        for mut chunk in rx {
            if shared.aborted() {
                self.recycle(chunk);
                break;
            }
            sort_chunk(&mut chunk, self.algorithm, false);
            if tx.send(chunk).is_err() {
                break;
            }
        }
    }

    fn write_stage(&self, rx: &Receiver<ParsedChunk>, shared: &Shared) {
        for chunk in rx {
            if shared.aborted() {
                self.recycle(chunk);
                break;
            }
            let result = self.spill(&chunk);
            self.recycle(chunk);
            if let Err(e) = result {
                shared.fail("writer", e);
                break;
            }
        }
    }

    /// Write one sorted chunk to a fresh spill file.
    fn spill(&self, chunk: &ParsedChunk) -> Result<()> {
        let path = self.registry.next_path();
        let written = write_spill(chunk, &path, self.compression_level)?;
        debug!(
            "Spilled {} records ({}) to {}",
            format_count(chunk.len() as u64),
            format_bytes(written),
            path.display()
        );
        Ok(())
    }

    fn recycle(&self, chunk: ParsedChunk) {
        let (raw, keys) = chunk.into_buffers();
        self.pool.recycle(raw);
        self.pool.recycle(keys);
    }
}
