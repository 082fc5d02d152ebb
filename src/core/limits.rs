//! Context-window budgets per model.
//!
//! Budgets are deliberately below each model's advertised window so the
//! prompt template and the generated answer still fit.

use std::collections::HashMap;

use crate::error::ConfigError;

/// Budget for any model identifier not in the table.
pub const DEFAULT_TOKEN_LIMIT: usize = 3000;

/// Built-in model budgets.
const BUILTIN_LIMITS: &[(&str, usize)] = &[
    ("gpt-35-turbo", 3000),
    ("gpt-4", 7000),
    ("gpt-4-32k", 31000),
    ("small-chat", 3000),
    ("large-chat", 7000),
    ("large-chat-extended", 31000),
];

/// Looks up the built-in budget for `model`.
///
/// Total: unknown identifiers return [`DEFAULT_TOKEN_LIMIT`].
#[must_use]
pub fn limit_for(model: &str) -> usize {
    BUILTIN_LIMITS
        .iter()
        .find(|(name, _)| *name == model)
        .map_or(DEFAULT_TOKEN_LIMIT, |&(_, limit)| limit)
}

/// Model budget table with optional deployment-specific overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelLimits {
    overrides: HashMap<String, usize>,
}

impl ModelLimits {
    /// Creates a table holding only the built-in budgets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the budget for `model`.
    #[must_use]
    pub fn with_limit(mut self, model: impl Into<String>, tokens: usize) -> Self {
        self.overrides.insert(model.into(), tokens);
        self
    }

    /// Returns the budget for `model`, preferring overrides over built-ins.
    #[must_use]
    pub fn limit_for(&self, model: &str) -> usize {
        self.overrides
            .get(model)
            .copied()
            .unwrap_or_else(|| limit_for(model))
    }

    /// Parses `model=tokens` pairs separated by commas.
    ///
    /// Used for the `DOCSEARCH_MODEL_LIMITS` environment variable, e.g.
    /// `gpt-4o=120000,gpt-4o-mini=120000`.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let mut limits = Self::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (model, tokens) = pair.split_once('=').ok_or_else(|| ConfigError::Invalid {
                field: "model_limits",
                message: format!("expected `model=tokens`, got `{pair}`"),
            })?;
            let tokens = tokens
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::Invalid {
                    field: "model_limits",
                    message: format!("`{pair}`: {e}"),
                })?;
            limits = limits.with_limit(model.trim(), tokens);
        }
        Ok(limits)
    }
}
