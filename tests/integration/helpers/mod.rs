//! Helper utilities for integration tests.

pub mod assertions;
pub mod record_generator;

pub use assertions::*;
pub use record_generator::*;
