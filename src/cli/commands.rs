//! CLI command implementations.
//!
//! Each command returns its rendered output; `main` prints it. Commands that
//! talk to a model bridge into async code through a tokio runtime.

#![allow(clippy::format_push_string)]

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::agent::client::create_provider;
use crate::agent::prompt::PromptSet;
use crate::agent::provider::LlmProvider;
use crate::cli::output::{OutputFormat, format_answer_report, format_tool_answer};
use crate::cli::parser::{Cli, Commands};
use crate::config::{Config, ConfigBuilder, model_limits_from_env};
use crate::core::{ModelLimits, estimate_tokens, passages_from_pages};
use crate::error::{CommandError, Result};
use crate::pipeline::AnswerPipeline;
use crate::tools::{NO_RESULTS_MESSAGE, ToolRegistry};

/// Separates pages in a text file.
const PAGE_BREAK: char = '\x0c';

/// Parameters for the ask-file command.
#[derive(Debug, Clone)]
pub struct AskFileParams<'a> {
    /// File to answer from.
    pub file: &'a Path,
    /// Question text.
    pub query: &'a str,
    /// Chat model override.
    pub model: Option<&'a str>,
    /// Passages kept by the similarity fallback.
    pub similarity_k: Option<usize>,
    /// Passages indexed by the similarity fallback.
    pub chunks_limit: Option<usize>,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, a file cannot be read,
/// or the command itself fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask { query, tool } => cmd_ask(cli, query, tool.as_deref(), format),
        Commands::AskFile {
            file,
            query,
            model,
            similarity_k,
            chunks_limit,
        } => {
            let params = AskFileParams {
                file,
                query,
                model: model.as_deref(),
                similarity_k: *similarity_k,
                chunks_limit: *chunks_limit,
            };
            cmd_ask_file(cli, &params, format)
        }
        Commands::Tools => cmd_tools(cli, format),
        Commands::Tokens { file, model } => {
            cmd_tokens(file, model, &model_limits_from_env()?, format)
        }
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Starts a config builder with the CLI's global overrides applied.
fn config_builder(cli: &Cli) -> ConfigBuilder {
    let builder = Config::builder();
    match &cli.prompt_dir {
        Some(dir) => builder.prompt_dir(dir),
        None => builder,
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
        })
}

fn provider_and_prompts(config: &Config) -> Result<(Arc<dyn LlmProvider>, PromptSet)> {
    let provider = create_provider(&config.llm)?;
    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    Ok((provider, prompts))
}

fn cmd_ask(cli: &Cli, query: &str, tool: Option<&str>, format: OutputFormat) -> Result<String> {
    let config = config_builder(cli).from_env().build()?;
    let (provider, prompts) = provider_and_prompts(&config)?;
    let registry = ToolRegistry::from_config(&config, provider, &prompts)?;

    let (name, text) = match tool {
        Some(name) => (name.to_string(), query.trim().to_string()),
        None => registry.route(query),
    };
    debug!(tool = name, "Routed query");

    let rt = runtime()?;
    let answer = match tool {
        // An explicitly requested tool reports its failure as an error.
        Some(_) => rt.block_on(registry.dispatch_to(&name, &text))?,
        None => rt.block_on(registry.answer(query)),
    };

    format_tool_answer(&name, &answer, format)
}

fn cmd_ask_file(cli: &Cli, params: &AskFileParams<'_>, format: OutputFormat) -> Result<String> {
    let mut builder = config_builder(cli);
    if let Some(model) = params.model {
        builder = builder.chat_model(model);
    }
    if let Some(k) = params.similarity_k {
        builder = builder.similarity_k(k);
    }
    if let Some(n) = params.chunks_limit {
        builder = builder.chunks_limit(n);
    }
    let config = builder.from_env().build()?;

    let text = std::fs::read_to_string(params.file)?;
    let pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
    let passages = passages_from_pages(&pages);
    debug!(
        file = %params.file.display(),
        pages = pages.len(),
        passages = passages.len(),
        "File split into passages"
    );

    let (provider, prompts) = provider_and_prompts(&config)?;
    let pipeline = AnswerPipeline::from_config(&config, provider, &prompts);

    let rt = runtime()?;
    let report = rt.block_on(pipeline.answer(params.query, passages))?;

    match report {
        Some(report) => format_answer_report(&report, format, cli.verbose),
        None => format_tool_answer("ask-file", NO_RESULTS_MESSAGE, format),
    }
}

fn cmd_tools(cli: &Cli, format: OutputFormat) -> Result<String> {
    let config = config_builder(cli).from_env().build()?;
    let (provider, prompts) = provider_and_prompts(&config)?;
    let registry = ToolRegistry::from_config(&config, provider, &prompts)?;

    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for tool in registry.tools() {
                let marker = if tool.name() == config.default_tool {
                    " (default)"
                } else {
                    ""
                };
                output.push_str(&format!(
                    "{}{marker}\n  {}\n",
                    tool.name(),
                    tool.description()
                ));
            }
            Ok(output)
        }
        OutputFormat::Json => {
            let tools: Vec<_> = registry
                .tools()
                .map(|tool| {
                    serde_json::json!({
                        "name": tool.name(),
                        "description": tool.description(),
                        "default": tool.name() == config.default_tool,
                    })
                })
                .collect();
            format.to_json(&tools)
        }
    }
}

fn cmd_tokens(
    file: &Path,
    model: &str,
    limits: &ModelLimits,
    format: OutputFormat,
) -> Result<String> {
    let text = std::fs::read_to_string(file)?;
    let tokens = estimate_tokens(&text);
    let limit = limits.limit_for(model);
    let fits = tokens <= limit;

    match format {
        OutputFormat::Text => Ok(format!(
            "{}: ~{tokens} tokens ({} budget {limit}: {})\n",
            file.display(),
            model,
            if fits { "fits" } else { "exceeds" }
        )),
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "file": file.to_string_lossy(),
            "model": model,
            "tokens": tokens,
            "limit": limit,
            "fits": fits,
        })),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str(&format!(
                    "  {}\n",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                ));
            }
            output.push_str("\nEdit these files to customize the system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            format.to_json(&json)
        }
    }
}
