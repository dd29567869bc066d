//! External sorting of `<id>. <text>` record files.
//!
//! Records are ordered by a collation-aware comparison of their text, with
//! ties broken by ascending numeric id. Each record's order is captured in a
//! single byte-comparable key (see [`keys`]), so every later stage compares
//! keys with a plain byte comparison.
//!
//! # Architecture
//!
//! The sorting process follows this pipeline:
//!
//! 1. **Read phase**: split the input into line-aligned chunks ([`chunk_reader`])
//! 2. **Parse phase**: split chunks into lines and derive keys ([`parser`])
//! 3. **Sort phase**: sort each chunk by key ([`chunk_sorter`], [`radix`])
//! 4. **Spill phase**: write each sorted chunk to a temp file ([`spill`])
//! 5. **Merge phase**: k-way merge of the spill files using a min-heap ([`merge`])
//!
//! Phases 1-4 run serially or as a multi-threaded pipeline ([`pipeline`]);
//! [`external`] drives the whole run.

pub mod buffer_pool;
pub mod chunk_reader;
pub mod chunk_sorter;
pub mod collation;
pub mod encoding;
pub mod external;
pub mod keys;
pub mod merge;
pub mod parser;
pub mod pipeline;
pub mod radix;
pub mod spill;
pub mod verify;

pub use chunk_sorter::SortAlgorithm;
pub use collation::ComparisonMode;
pub use encoding::{LineTerminator, TextEncoding};
pub use external::{DEFAULT_CHUNK_SIZE, ExternalSorter, SortStats, default_output_path};
pub use keys::{KeyDeriver, Record, compare_keys, parse_record};
pub use verify::{VerifyReport, verify_sorted};
