//! CLI module
//!
//! Command-line interface for paginating an API described by a config file.
//!
//! # Commands
//!
//! - `fetch` - Walk every page, printing pages or items as JSON lines
//! - `validate` - Check a config file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
