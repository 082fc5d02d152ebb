//! CLI layer for docsearch.
//!
//! Provides the command-line interface using clap, with commands for asking
//! questions through the tool registry, answering from local files and
//! managing prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
