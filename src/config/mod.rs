/// Configuration system for repo-wiki
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, WikiError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Generative model backend configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Source reading and chunking configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Structure and page generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Retrieval index configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Wiki cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Generative model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Wire format: "ollama" or "openai"
    #[serde(default = "default_llm_backend")]
    pub backend: String,

    /// Base URL of the generation server
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier sent to the backend; also part of the cache key
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Name of the environment variable holding the API key (openai format)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_embedding_model")]
    pub model_name: String,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Source reading and chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks of one source
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Maximum file size to read (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// File extensions whose contents are indexed
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns a file must match (empty = everything)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Glob patterns excluding files
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

/// Structure and page generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Output tokens requested per structure-synthesis call
    #[serde(default = "default_max_output_tokens")]
    pub structure_max_tokens: usize,

    /// Maximum structure-synthesis calls per run
    #[serde(default = "default_max_iterations")]
    pub structure_max_iterations: usize,

    /// Trailing characters of the buffer quoted in a continuation prompt
    #[serde(default = "default_continuation_window")]
    pub continuation_window: usize,

    /// Output tokens requested per page
    #[serde(default = "default_max_output_tokens")]
    pub page_max_tokens: usize,

    /// Pages generated concurrently
    #[serde(default = "default_page_concurrency")]
    pub page_concurrency: usize,
}

/// Retrieval index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunks retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Directory under which per-repository indexes are created
    #[serde(default = "default_index_root")]
    pub index_root: PathBuf,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding wiki cache entries
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

// Default value functions
fn default_llm_backend() -> String {
    "ollama".to_string()
}

fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_id() -> String {
    "qwen3:14b".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    600
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_max_file_size() -> usize {
    1_048_576 // 1 MB
}

fn default_extensions() -> Vec<String> {
    [
        "py", "js", "ts", "java", "cpp", "c", "go", "rb", "php", "md", "json", "yaml", "yml",
        "rs", "toml",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/dist/**".to_string(),
    ]
}

fn default_max_output_tokens() -> usize {
    4096
}

fn default_max_iterations() -> usize {
    5
}

fn default_continuation_window() -> usize {
    500
}

fn default_page_concurrency() -> usize {
    1
}

fn default_top_k() -> usize {
    5
}

fn default_index_root() -> PathBuf {
    crate::paths::PlatformPaths::default_index_root()
}

fn default_cache_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_wiki_cache_dir()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_llm_backend(),
            base_url: default_llm_base_url(),
            model_id: default_model_id(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_embedding_model(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size: default_max_file_size(),
            extensions: default_extensions(),
            include_patterns: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            structure_max_tokens: default_max_output_tokens(),
            structure_max_iterations: default_max_iterations(),
            continuation_window: default_continuation_window(),
            page_max_tokens: default_max_output_tokens(),
            page_concurrency: default_page_concurrency(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            index_root: default_index_root(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> WikiError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, WikiError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, WikiError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), WikiError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), WikiError> {
        if self.llm.backend != "ollama" && self.llm.backend != "openai" {
            return Err(invalid(
                "llm.backend",
                format!("must be 'ollama' or 'openai', got '{}'", self.llm.backend),
            ));
        }

        if self.llm.model_id.trim().is_empty() {
            return Err(invalid("llm.model_id", "must not be empty"));
        }

        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }

        if self.indexing.chunk_size == 0 {
            return Err(invalid("indexing.chunk_size", "must be greater than 0"));
        }

        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(invalid(
                "indexing.chunk_overlap",
                format!(
                    "must be smaller than chunk_size ({}), got {}",
                    self.indexing.chunk_size, self.indexing.chunk_overlap
                ),
            ));
        }

        if self.indexing.max_file_size == 0 {
            return Err(invalid("indexing.max_file_size", "must be greater than 0"));
        }

        if self.generation.structure_max_iterations == 0 {
            return Err(invalid(
                "generation.structure_max_iterations",
                "must be greater than 0",
            ));
        }

        if self.generation.structure_max_tokens == 0 || self.generation.page_max_tokens == 0 {
            return Err(invalid(
                "generation.max_tokens",
                "output token budgets must be greater than 0",
            ));
        }

        if self.generation.page_concurrency == 0 {
            return Err(invalid(
                "generation.page_concurrency",
                "must be greater than 0",
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(invalid("retrieval.top_k", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("REPO_WIKI_LLM_BACKEND") {
            self.llm.backend = backend;
        }

        if let Ok(url) = std::env::var("REPO_WIKI_LLM_URL") {
            self.llm.base_url = url;
        }

        if let Ok(model) = std::env::var("REPO_WIKI_MODEL") {
            self.llm.model_id = model;
        }

        if let Ok(model) = std::env::var("REPO_WIKI_EMBEDDING_MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(path) = std::env::var("REPO_WIKI_INDEX_ROOT") {
            self.retrieval.index_root = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("REPO_WIKI_CACHE_DIR") {
            self.cache.cache_dir = PathBuf::from(path);
        }

        if let Ok(concurrency) = std::env::var("REPO_WIKI_PAGE_CONCURRENCY")
            && let Ok(value) = concurrency.parse()
        {
            self.generation.page_concurrency = value;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, WikiError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests;
