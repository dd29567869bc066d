//! K-way merge of sorted spill files.
//!
//! One [`MergeCursor`] per spill file sits in a fixed-array binary min-heap
//! ordered by current key. The root's line is emitted, the root cursor advances
//! and sifts down; an exhausted cursor is popped off the heap and dropped,
//! closing its file. Total work is O(records × log files).

use std::io::Write;
use std::path::PathBuf;

use log::{debug, info};

use super::encoding::LineTerminator;
use super::radix::{heap_make, heap_pop, heap_sift_down};
use super::spill::MergeCursor;
use crate::errors::Result;
use crate::logging::format_count;
use crate::progress::ProgressTracker;

/// Records between merge progress log lines.
const MERGE_PROGRESS_INTERVAL: u64 = 5_000_000;

/// Merge the sorted spill files at `paths` into `out`.
///
/// Each cursor reads through a buffer of `buffer_size` bytes. `compressed` says
/// whether the spills were written with gzip. Every line is written followed by
/// `terminator`. Returns the number of records written.
///
/// # Errors
///
/// Propagates spill decode errors and write failures.
pub fn merge_spills<W: Write>(
    paths: &[PathBuf],
    buffer_size: usize,
    compressed: bool,
    terminator: LineTerminator,
    out: &mut W,
) -> Result<u64> {
    info!("Merging {} spill files...", paths.len());

    let mut heap: Vec<MergeCursor> = Vec::with_capacity(paths.len());
    for path in paths {
        let mut cursor = MergeCursor::open(path, buffer_size, compressed)?;
        if cursor.advance()? {
            heap.push(cursor);
        } else {
            debug!("Spill file {} is empty", path.display());
        }
    }

    // Reversed comparison turns the max-heap helpers into a min-heap.
    let lt = |a: &MergeCursor, b: &MergeCursor| a.key() > b.key();
    heap_make(&mut heap, &lt);

    let progress = ProgressTracker::new("Merged records").with_interval(MERGE_PROGRESS_INTERVAL);
    let terminator = terminator.as_bytes();
    let mut heap_size = heap.len();

    while heap_size > 0 {
        let top = &mut heap[0];
        out.write_all(top.line())?;
        out.write_all(terminator)?;
        progress.record(1);

        if top.advance()? {
            heap_sift_down(&mut heap, 0, heap_size, &lt);
        } else {
            heap_size = heap_pop(&mut heap, heap_size, &lt);
            if let Some(done) = heap.pop() {
                let path = done.path().display();
                debug!("Spill file {path} exhausted after {} records", done.records());
            }
        }
    }

    progress.log_final();
    info!("Merge complete: {} records merged", format_count(progress.count()));
    Ok(progress.count())
}
