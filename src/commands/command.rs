//! Command trait definition for CLI commands.
//!
//! This module defines the [`Command`] trait that every xsort subcommand implements.
//! The trait uses `enum_dispatch` for efficient dynamic dispatch across command variants.

use anyhow::Result;
use enum_dispatch::enum_dispatch;

/// Trait implemented by all xsort CLI commands.
///
/// `command_line` is the full invocation, logged at the start of each run.
#[enum_dispatch]
pub trait Command {
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self, command_line: &str) -> Result<()>;
}
