//! LLM agents used by the tools.
//!
//! Every model interaction goes through a pluggable [`LlmProvider`] backed by
//! OpenAI-compatible APIs. Agents are thin role definitions (model, system
//! prompt, functions) run either as a single completion or through the
//! function-calling loop.
//!
//! # Architecture
//!
//! ```text
//! @docsearch → LlmSummarizer
//!   ├── stuff:      CombineAgent(all passages)
//!   └── map_reduce: ExtractAgent × N (sequential) → CombineAgent(extracts)
//!
//! @csvfile / @sqlsearch / @bing → WorkerAgent
//!   └── agentic_loop ⇄ FunctionBackend (CSV, SQLite, web search)
//!
//! @chatgpt → ChatAgent (one completion)
//! ```

pub mod agentic_loop;
pub mod chat;
pub mod client;
pub mod executor;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod summarizer;
pub mod tool;
pub mod traits;
pub mod worker;

pub use chat::ChatAgent;
pub use client::create_provider;
pub use executor::FunctionBackend;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use summarizer::{LlmSummarizer, Summarizer};
pub use tool::{ToolCall, ToolDefinition, ToolResult};
pub use traits::{Agent, AgentResponse, execute_with_tools};
pub use worker::WorkerAgent;
