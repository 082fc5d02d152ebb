//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::agent::prompt::PROMPT_DIR_ENV;

/// docsearch: retrieval-augmented question answering.
///
/// Routes a question to a search index, a CSV file, a SQL database, the web
/// or plain chat, and answers it within the model's token budget.
#[derive(Parser, Debug)]
#[command(name = "docsearch")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory with prompt template overrides.
    #[arg(long, env = PROMPT_DIR_ENV, global = true)]
    pub prompt_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question with the tool its trigger term names.
    ///
    /// Without a trigger term (`@docsearch`, `@csvfile`, `@sqlsearch`,
    /// `@bing`, `@chatgpt`) the default tool answers.
    #[command(after_help = r#"Examples:
  docsearch ask "@docsearch what were the Q3 revenue drivers?"
  docsearch ask "@csvfile how many states reported cases on 2020-03-01?"
  docsearch ask "@sqlsearch which customer spent the most?"
  docsearch ask "who wrote Middlemarch?"               # Default tool
  docsearch ask --tool @bing "latest rust release"     # Explicit tool
  docsearch --format json ask "@docsearch ..." | jq .
"#)]
    Ask {
        /// Question text.
        query: String,

        /// Run this tool instead of routing on trigger terms.
        #[arg(short, long)]
        tool: Option<String>,
    },

    /// Answer a question from a local text file.
    ///
    /// The file is split into passages (pages separated by form feeds) and
    /// answered with the same context selection and citation rendering as
    /// `@docsearch`.
    #[command(after_help = r#"Examples:
  docsearch ask-file report.txt "What does the report conclude?"
  docsearch ask-file notes.txt "Summarize the risks" --model gpt-4
  docsearch ask-file big.txt "Who is the author?" -k 8 --chunks-limit 200
"#)]
    AskFile {
        /// Text file to answer from.
        file: PathBuf,

        /// Question text.
        query: String,

        /// Chat model; also selects the token budget.
        #[arg(short, long)]
        model: Option<String>,

        /// Passages kept when the context is too large.
        #[arg(short = 'k', long)]
        similarity_k: Option<usize>,

        /// Passages indexed when the context is too large.
        #[arg(long)]
        chunks_limit: Option<usize>,
    },

    /// List the tools available under the current configuration.
    Tools,

    /// Estimate the token count of a file against a model's budget.
    #[command(after_help = r#"Examples:
  docsearch tokens report.txt
  docsearch tokens report.txt --model gpt-4-32k
"#)]
    Tokens {
        /// File to measure.
        file: PathBuf,

        /// Model whose budget to compare against.
        #[arg(short, long, default_value = "gpt-35-turbo")]
        model: String,
    },

    /// Write the default prompt templates for customization.
    ///
    /// Existing files are never overwritten.
    #[command(after_help = r#"Examples:
  docsearch init-prompts                      # ~/.config/docsearch/prompts
  docsearch init-prompts --dir ./prompts      # Custom directory
"#)]
    InitPrompts {
        /// Target directory (default: ~/.config/docsearch/prompts).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}
