//! # docsearch
//!
//! Retrieval-augmented question answering. A question is routed by its
//! trigger term to one tool:
//!
//! | Term | Answers from |
//! |------|--------------|
//! | `@docsearch` | semantic search indexes, summarized with citations |
//! | `@csvfile` | a CSV file, through a tool-calling agent |
//! | `@sqlsearch` | a read-only SQLite database, through a tool-calling agent |
//! | `@bing` | live web search, through a tool-calling agent |
//! | `@chatgpt` | the model's own knowledge |
//!
//! Retrieved passages are ranked, measured against the model's token budget
//! and either sent whole or narrowed by similarity before an answer is
//! generated.
//!
//! ## Example
//!
//! ```no_run
//! use docsearch::agent::{PromptSet, create_provider};
//! use docsearch::config::Config;
//! use docsearch::tools::ToolRegistry;
//!
//! # async fn run() -> docsearch::Result<()> {
//! let config = Config::from_env()?;
//! let provider = create_provider(&config.llm)?;
//! let prompts = PromptSet::load(config.prompt_dir.as_deref());
//! let registry = ToolRegistry::from_config(&config, provider, &prompts)?;
//! let answer = registry.answer("@docsearch what drove Q3 revenue?").await;
//! # let _ = answer;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod core;
pub mod embedding;
pub mod error;
pub mod pipeline;
pub mod search;
pub mod tools;

pub use error::{Error, Result};
