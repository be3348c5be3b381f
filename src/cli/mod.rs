//! Command-line interface for docforge.

pub mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands};
