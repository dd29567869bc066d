//! In-memory sorting of a parsed chunk.

use std::fmt;

use super::keys::compare_keys;
use super::parser::{Entry, ParsedChunk};
use super::radix::{counting_radix_sort, hybrid_sort, radix_quicksort};

/// Chunks with more entries than this use rayon for comparison sorting.
const PARALLEL_SORT_THRESHOLD: usize = 10_000;

/// Algorithm used to sort each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortAlgorithm {
    /// Pattern-defeating quicksort over key comparisons.
    Comparison,
    /// Three-way radix quicksort.
    #[default]
    RadixQuick,
    /// MSD counting radix sort.
    CountingRadix,
}

impl fmt::Display for SortAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortAlgorithm::Comparison => "comparison",
            SortAlgorithm::RadixQuick => "radix-quick",
            SortAlgorithm::CountingRadix => "counting-radix",
        })
    }
}

/// Sort the entries of `chunk` by key.
///
/// `parallel` allows the comparison sort to use the rayon thread pool; the
/// radix sorts are always single-threaded.
pub fn sort_chunk(chunk: &mut ParsedChunk, algorithm: SortAlgorithm, parallel: bool) {
    let keys: &[u8] = &chunk.keys;
    let entries = &mut chunk.entries;
    let key_of = move |e: &Entry| e.key_in(keys);

    match algorithm {
        SortAlgorithm::Comparison => {
            let parallel = parallel && entries.len() > PARALLEL_SORT_THRESHOLD;
            hybrid_sort(entries, |a, b| compare_keys(key_of(a), key_of(b)), parallel);
        }
        SortAlgorithm::RadixQuick => radix_quicksort(entries, key_of),
        SortAlgorithm::CountingRadix => counting_radix_sort(entries, key_of),
    }
}
