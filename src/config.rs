//! Runtime configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! Everything is validated once in [`ConfigBuilder::build`]; a partially
//! configured backend fails there rather than on the first query that needs it.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::ModelLimits;
use crate::core::select::{DEFAULT_SIMILARITY_K, DEFAULT_TRUNCATE_LIMIT};
use crate::error::ConfigError;
use crate::tools::retry::RetryPolicy;

/// Default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-35-turbo";
/// Default max tokens for generated answers.
const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;
/// Default search API version.
const DEFAULT_SEARCH_API_VERSION: &str = "2023-07-01-Preview";
/// Default semantic ranking configuration name.
const DEFAULT_SEMANTIC_CONFIG: &str = "my-semantic-config";
/// Default query language for the search backend.
const DEFAULT_QUERY_LANGUAGE: &str = "en-us";
/// Default results per index.
const DEFAULT_SEARCH_TOP_K: usize = 10;
/// Default reranker score threshold.
const DEFAULT_RERANKER_THRESHOLD: f64 = 1.0;
/// Default web search endpoint.
const DEFAULT_BING_URL: &str = "https://api.bing.microsoft.com/v7.0/search";
/// Default web results per query.
const DEFAULT_WEB_TOP_K: usize = 5;
/// Default answer language.
const DEFAULT_RESPONSE_LANGUAGE: &str = "English";
/// Default tool for queries without a trigger term.
const DEFAULT_TOOL: &str = "@chatgpt";

/// LLM provider settings shared by chat, agents and embeddings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for Azure, proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Chat model used by every tool; also selects the token budget.
    pub chat_model: String,
    /// Embedding model. When unset, embeddings are computed locally.
    pub embedding_model: Option<String>,
    /// Maximum tokens for generated responses.
    pub max_tokens: u32,
    /// HTTP timeout for every outbound request.
    pub timeout: Duration,
    /// Maximum tool-calling loop iterations before aborting.
    pub max_tool_iterations: usize,
}

/// Search index backend settings.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Service endpoint, e.g. `https://my-search.search.windows.net`.
    pub endpoint: String,
    /// Query key.
    pub api_key: String,
    /// REST API version.
    pub api_version: String,
    /// Indexes queried for every question.
    pub indexes: Vec<String>,
    /// Semantic ranking configuration name.
    pub semantic_config: String,
    /// Query language.
    pub query_language: String,
    /// Results requested per index.
    pub top_k: usize,
    /// Hits at or below this reranker score are dropped.
    pub reranker_threshold: f64,
}

/// Web search backend settings.
#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    /// Subscription key.
    pub api_key: String,
    /// Search endpoint.
    pub endpoint: String,
    /// Results requested per query.
    pub top_k: usize,
}

/// Retry policies for the agent-backed tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// `@csvfile` policy.
    pub tabular: RetryPolicy,
    /// `@sqlsearch` policy.
    pub sql: RetryPolicy,
    /// `@bing` policy.
    pub web: RetryPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            tabular: RetryPolicy::new(5),
            sql: RetryPolicy::new(2),
            web: RetryPolicy::new(3),
        }
    }
}

/// Configuration for the whole system.
#[derive(Debug, Clone)]
pub struct Config {
    /// LLM settings.
    pub llm: LlmConfig,
    /// Search backend; `@docsearch` is available only when set.
    pub search: Option<SearchConfig>,
    /// Web search backend; `@bing` is available only when set.
    pub web: Option<WebSearchConfig>,
    /// CSV file for `@csvfile`.
    pub csv_path: Option<PathBuf>,
    /// SQLite database for `@sqlsearch`.
    pub sqlite_path: Option<PathBuf>,
    /// Access token appended to citation links.
    pub citation_token: Option<String>,
    /// Passages kept by the similarity fallback.
    pub similarity_k: usize,
    /// Passages indexed by the similarity fallback.
    pub chunks_limit: usize,
    /// Language answers are written in.
    pub response_language: String,
    /// Model budget table.
    pub model_limits: ModelLimits,
    /// Retry policies.
    pub retry: RetrySettings,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<PathBuf>,
    /// Tool used when a query names none.
    pub default_tool: String,
}

impl Config {
    /// Creates a new builder for `Config`.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the API key is missing or a section is
    /// incomplete.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }
}

/// Environment variable holding model budget overrides (`model=tokens,...`).
pub const MODEL_LIMITS_ENV: &str = "DOCSEARCH_MODEL_LIMITS";

/// The model budget table with overrides from [`MODEL_LIMITS_ENV`].
///
/// Unlike [`Config::from_env`] this needs no API key, so offline commands can
/// use the same budgets as the context selector.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the variable is malformed.
pub fn model_limits_from_env() -> Result<ModelLimits, ConfigError> {
    env(MODEL_LIMITS_ENV).map_or_else(|| Ok(ModelLimits::default()), |spec| ModelLimits::parse(&spec))
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env(name).and_then(|v| v.trim().parse().ok())
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    chat_model: Option<String>,
    embedding_model: Option<String>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_tool_iterations: Option<usize>,
    search_endpoint: Option<String>,
    search_api_key: Option<String>,
    search_api_version: Option<String>,
    search_indexes: Option<Vec<String>>,
    semantic_config: Option<String>,
    search_top_k: Option<usize>,
    reranker_threshold: Option<f64>,
    web_api_key: Option<String>,
    web_endpoint: Option<String>,
    csv_path: Option<PathBuf>,
    sqlite_path: Option<PathBuf>,
    citation_token: Option<String>,
    similarity_k: Option<usize>,
    chunks_limit: Option<usize>,
    response_language: Option<String>,
    model_limits: Option<String>,
    retry: Option<RetrySettings>,
    prompt_dir: Option<PathBuf>,
    default_tool: Option<String>,
}

impl ConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = env("DOCSEARCH_PROVIDER");
        }
        if self.api_key.is_none() {
            self.api_key = env("OPENAI_API_KEY").or_else(|| env("DOCSEARCH_API_KEY"));
        }
        if self.base_url.is_none() {
            self.base_url = env("OPENAI_BASE_URL").or_else(|| env("DOCSEARCH_BASE_URL"));
        }
        if self.chat_model.is_none() {
            self.chat_model = env("DOCSEARCH_CHAT_MODEL");
        }
        if self.embedding_model.is_none() {
            self.embedding_model = env("DOCSEARCH_EMBEDDING_MODEL");
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("DOCSEARCH_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.search_endpoint.is_none() {
            self.search_endpoint = env("SEARCH_ENDPOINT");
        }
        if self.search_api_key.is_none() {
            self.search_api_key = env("SEARCH_API_KEY");
        }
        if self.search_api_version.is_none() {
            self.search_api_version = env("SEARCH_API_VERSION");
        }
        if self.search_indexes.is_none() {
            self.search_indexes = env("SEARCH_INDEXES").map(|v| split_list(&v));
        }
        if self.semantic_config.is_none() {
            self.semantic_config = env("SEARCH_SEMANTIC_CONFIG");
        }
        if self.search_top_k.is_none() {
            self.search_top_k = env_parse("SEARCH_TOP_K");
        }
        if self.reranker_threshold.is_none() {
            self.reranker_threshold = env_parse("SEARCH_RERANKER_THRESHOLD");
        }
        if self.web_api_key.is_none() {
            self.web_api_key = env("BING_SEARCH_KEY");
        }
        if self.web_endpoint.is_none() {
            self.web_endpoint = env("BING_SEARCH_URL");
        }
        if self.csv_path.is_none() {
            self.csv_path = env("DOCSEARCH_CSV_PATH").map(PathBuf::from);
        }
        if self.sqlite_path.is_none() {
            self.sqlite_path = env("DOCSEARCH_SQLITE_PATH").map(PathBuf::from);
        }
        if self.citation_token.is_none() {
            self.citation_token = env("DATASOURCE_SAS_TOKEN");
        }
        if self.similarity_k.is_none() {
            self.similarity_k = env_parse("DOCSEARCH_SIMILARITY_K");
        }
        if self.chunks_limit.is_none() {
            self.chunks_limit = env_parse("DOCSEARCH_CHUNKS_LIMIT");
        }
        if self.response_language.is_none() {
            self.response_language = env("DOCSEARCH_RESPONSE_LANGUAGE");
        }
        if self.model_limits.is_none() {
            self.model_limits = env(MODEL_LIMITS_ENV);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env("DOCSEARCH_PROMPT_DIR").map(PathBuf::from);
        }
        if self.default_tool.is_none() {
            self.default_tool = env("DOCSEARCH_DEFAULT_TOOL");
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = Some(model.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Sets the response max tokens.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the search endpoint.
    #[must_use]
    pub fn search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.search_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the search query key.
    #[must_use]
    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    /// Sets the indexes to query.
    #[must_use]
    pub fn search_indexes<I, S>(mut self, indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_indexes = Some(indexes.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the results requested per index.
    #[must_use]
    pub const fn search_top_k(mut self, n: usize) -> Self {
        self.search_top_k = Some(n);
        self
    }

    /// Sets the reranker score threshold.
    #[must_use]
    pub const fn reranker_threshold(mut self, threshold: f64) -> Self {
        self.reranker_threshold = Some(threshold);
        self
    }

    /// Sets the web search key.
    #[must_use]
    pub fn web_api_key(mut self, key: impl Into<String>) -> Self {
        self.web_api_key = Some(key.into());
        self
    }

    /// Sets the web search endpoint.
    #[must_use]
    pub fn web_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.web_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the CSV file for the tabular tool.
    #[must_use]
    pub fn csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = Some(path.into());
        self
    }

    /// Sets the SQLite database for the SQL tool.
    #[must_use]
    pub fn sqlite_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sqlite_path = Some(path.into());
        self
    }

    /// Sets the citation access token.
    #[must_use]
    pub fn citation_token(mut self, token: impl Into<String>) -> Self {
        self.citation_token = Some(token.into());
        self
    }

    /// Sets how many passages the similarity fallback keeps.
    #[must_use]
    pub const fn similarity_k(mut self, k: usize) -> Self {
        self.similarity_k = Some(k);
        self
    }

    /// Sets how many passages the similarity fallback indexes.
    #[must_use]
    pub const fn chunks_limit(mut self, n: usize) -> Self {
        self.chunks_limit = Some(n);
        self
    }

    /// Sets the answer language.
    #[must_use]
    pub fn response_language(mut self, language: impl Into<String>) -> Self {
        self.response_language = Some(language.into());
        self
    }

    /// Sets model budget overrides as `model=tokens` pairs.
    #[must_use]
    pub fn model_limits(mut self, spec: impl Into<String>) -> Self {
        self.model_limits = Some(spec.into());
        self
    }

    /// Sets the retry policies.
    #[must_use]
    pub const fn retry(mut self, retry: RetrySettings) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the tool used when a query names none.
    #[must_use]
    pub fn default_tool(mut self, name: impl Into<String>) -> Self {
        self.default_tool = Some(name.into());
        self
    }

    /// Builds the [`Config`].
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ApiKeyMissing`] if no API key was set.
    /// - [`ConfigError::MissingField`] if the search section is partially set.
    /// - [`ConfigError::Invalid`] for unusable values, including backend
    ///   files that do not exist.
    pub fn build(self) -> Result<Config, ConfigError> {
        let api_key = self.api_key.ok_or(ConfigError::ApiKeyMissing)?;

        let llm = LlmConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            chat_model: self
                .chat_model
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: self.embedding_model,
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
        };

        let search = build_search(
            self.search_endpoint,
            self.search_api_key,
            self.search_indexes,
            SearchDefaults {
                api_version: self.search_api_version,
                semantic_config: self.semantic_config,
                top_k: self.search_top_k,
                reranker_threshold: self.reranker_threshold,
            },
        )?;

        let web = self.web_api_key.map(|api_key| WebSearchConfig {
            api_key,
            endpoint: self
                .web_endpoint
                .unwrap_or_else(|| DEFAULT_BING_URL.to_string()),
            top_k: DEFAULT_WEB_TOP_K,
        });

        for (field, path) in [("csv_path", &self.csv_path), ("sqlite_path", &self.sqlite_path)] {
            if let Some(path) = path
                && !path.is_file()
            {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("{} is not a readable file", path.display()),
                });
            }
        }

        let similarity_k = self.similarity_k.unwrap_or(DEFAULT_SIMILARITY_K);
        let chunks_limit = self.chunks_limit.unwrap_or(DEFAULT_TRUNCATE_LIMIT);
        if similarity_k == 0 {
            return Err(ConfigError::Invalid {
                field: "similarity_k",
                message: "must be at least 1".to_string(),
            });
        }
        if chunks_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "chunks_limit",
                message: "must be at least 1".to_string(),
            });
        }

        let model_limits = match self.model_limits {
            Some(spec) => ModelLimits::parse(&spec)?,
            None => ModelLimits::default(),
        };

        Ok(Config {
            llm,
            search,
            web,
            csv_path: self.csv_path,
            sqlite_path: self.sqlite_path,
            citation_token: self.citation_token,
            similarity_k,
            chunks_limit,
            response_language: self
                .response_language
                .unwrap_or_else(|| DEFAULT_RESPONSE_LANGUAGE.to_string()),
            model_limits,
            retry: self.retry.unwrap_or_default(),
            prompt_dir: self.prompt_dir,
            default_tool: self
                .default_tool
                .unwrap_or_else(|| DEFAULT_TOOL.to_string()),
        })
    }
}

struct SearchDefaults {
    api_version: Option<String>,
    semantic_config: Option<String>,
    top_k: Option<usize>,
    reranker_threshold: Option<f64>,
}

fn build_search(
    endpoint: Option<String>,
    api_key: Option<String>,
    indexes: Option<Vec<String>>,
    rest: SearchDefaults,
) -> Result<Option<SearchConfig>, ConfigError> {
    if endpoint.is_none() && api_key.is_none() && indexes.is_none() {
        return Ok(None);
    }

    let missing = |field| ConfigError::MissingField {
        section: "search",
        field,
    };
    let endpoint = endpoint.ok_or_else(|| missing("endpoint"))?;
    let api_key = api_key.ok_or_else(|| missing("api_key"))?;
    let indexes = indexes
        .filter(|i| !i.is_empty())
        .ok_or_else(|| missing("indexes"))?;

    Ok(Some(SearchConfig {
        endpoint: endpoint.trim_end_matches('/').to_string(),
        api_key,
        api_version: rest
            .api_version
            .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),
        indexes,
        semantic_config: rest
            .semantic_config
            .unwrap_or_else(|| DEFAULT_SEMANTIC_CONFIG.to_string()),
        query_language: DEFAULT_QUERY_LANGUAGE.to_string(),
        top_k: rest.top_k.unwrap_or(DEFAULT_SEARCH_TOP_K),
        reranker_threshold: rest.reranker_threshold.unwrap_or(DEFAULT_RERANKER_THRESHOLD),
    }))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = Config::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.similarity_k, 4);
        assert_eq!(config.chunks_limit, 100);
        assert_eq!(config.response_language, "English");
        assert_eq!(config.default_tool, "@chatgpt");
        assert_eq!(config.retry.tabular.max_attempts, 5);
        assert_eq!(config.retry.sql.max_attempts, 2);
        assert_eq!(config.retry.web.max_attempts, 3);
        assert!(config.search.is_none());
        assert!(config.web.is_none());
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = Config::builder().build();
        assert!(matches!(result, Err(ConfigError::ApiKeyMissing)));
    }

    #[test]
    fn test_complete_search_section() {
        let config = Config::builder()
            .api_key("key")
            .search_endpoint("https://svc.search.windows.net/")
            .search_api_key("search-key")
            .search_indexes(["cord19", "books"])
            .reranker_threshold(1.5)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let search = config.search.unwrap_or_else(|| unreachable!());
        assert_eq!(search.endpoint, "https://svc.search.windows.net");
        assert_eq!(search.indexes, vec!["cord19", "books"]);
        assert_eq!(search.top_k, 10);
        assert_eq!(search.semantic_config, "my-semantic-config");
        assert!((search.reranker_threshold - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_search_section_fails() {
        let result = Config::builder()
            .api_key("key")
            .search_endpoint("https://svc.search.windows.net")
            .search_indexes(["cord19"])
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingField {
                section: "search",
                field: "api_key"
            })
        ));
    }

    #[test]
    fn test_missing_backend_file_fails() {
        let result = Config::builder()
            .api_key("key")
            .csv_path("/definitely/not/here.csv")
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "csv_path",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_similarity_k_fails() {
        let result = Config::builder().api_key("key").similarity_k(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_model_limit_overrides() {
        let config = Config::builder()
            .api_key("key")
            .model_limits("gpt-4o=120000")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.model_limits.limit_for("gpt-4o"), 120_000);
        assert!(
            Config::builder()
                .api_key("key")
                .model_limits("gpt-4o")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_web_enabled_by_key() {
        let config = Config::builder()
            .api_key("key")
            .web_api_key("bing")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let web = config.web.unwrap_or_else(|| unreachable!());
        assert_eq!(web.endpoint, DEFAULT_BING_URL);
        assert_eq!(web.top_k, DEFAULT_WEB_TOP_K);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
    }
}
