//! docsearch command-line entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use docsearch::cli::{Cli, execute};

#[allow(clippy::print_stdout)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = execute(&cli)?;
    if !output.is_empty() {
        print!("{output}");
    }
    Ok(())
}
