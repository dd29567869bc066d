//! Integration tests for xsort.
//!
//! These tests run whole sorts through the library and the `xsort` binary,
//! covering order, content, failure cleanup and the CLI surface.

mod helpers;
mod test_error_paths;
mod test_generate_command;
mod test_pipeline_concurrency;
mod test_sort_command;
