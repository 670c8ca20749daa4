use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "rag_documents";

/// Which LLM backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAi,
    Gemini,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

impl ProviderKind {
    /// Default base URL for this backend's OpenAI-compatible surface.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => DEFAULT_OLLAMA_URL,
            ProviderKind::OpenAi => DEFAULT_OPENAI_URL,
            ProviderKind::Gemini => DEFAULT_GEMINI_URL,
        }
    }

    /// Environment variable holding the API key, if the backend needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Ollama => None,
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
        }
    }
}

/// Top-level configuration, one section per component.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("ragkit").join("config.toml"))
    }

    /// Load from the config file if present, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        // Pick up a local .env before reading env overrides
        let _ = dotenvy::dotenv();

        let mut config = if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(kind) = std::env::var("RAGKIT_PROVIDER")
            && let Ok(parsed) = kind.parse()
        {
            self.provider.kind = parsed;
        }
        if let Ok(url) = std::env::var("RAGKIT_PROVIDER_URL") {
            self.provider.base_url = Some(url);
        }
        if self.provider.api_key.is_none()
            && let Some(env) = self.provider.kind.api_key_env()
            && let Ok(key) = std::env::var(env)
        {
            self.provider.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("RAGKIT_QDRANT_URL") {
            self.vector_store.url = url;
        }
        if let Ok(collection) = std::env::var("RAGKIT_COLLECTION") {
            self.vector_store.collection = collection;
        }
    }

    /// Reject invalid parameters before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ingestion.validate()?;
        self.search.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    /// Override for the backend's default base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_chat_model() -> String {
    "llama3.2".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: None,
            api_key: None,
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Effective base URL: explicit override or the backend default.
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.kind.default_base_url().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: u64,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_embedding_dim() -> u64 {
    768
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection(),
            api_key: None,
            embedding_dim: default_embedding_dim(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Target chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between adjacent chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Run documents through the LLM cleaner before chunking.
    #[serde(default)]
    pub clean_content: bool,

    /// Clear the target collection before writing.
    #[serde(default)]
    pub cleanup_collection: bool,

    /// Bound on concurrently processed sources.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Chunk texts per embedding request.
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// File patterns to skip when walking directories.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_chunk_size() -> usize {
    1200
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_max_concurrency() -> usize {
    4
}

fn default_embed_batch_size() -> usize {
    16
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/.git/**".to_string(),
        "**/__pycache__/**".to_string(),
        "**/.venv/**".to_string(),
    ]
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            clean_content: false,
            cleanup_collection: false,
            max_concurrency: default_max_concurrency(),
            embed_batch_size: default_embed_batch_size(),
            max_file_size: default_max_file_size(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

impl IngestionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be positive".into(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.embed_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embed_batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Chunks to retrieve per pass.
    #[serde(default = "default_top_k")]
    pub top_k: u64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Relevance threshold in [0, 1] accepted without further refinement.
    #[serde(default = "default_min_relevance_score")]
    pub min_relevance_score: f64,
}

fn default_top_k() -> u64 {
    4
}

fn default_max_iterations() -> u32 {
    3
}

fn default_min_relevance_score() -> f64 {
    0.7
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_iterations: default_max_iterations(),
            min_relevance_score: default_min_relevance_score(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "top_k must be at least 1".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "max_iterations must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_relevance_score) {
            return Err(ConfigError::ValidationError(format!(
                "min_relevance_score must be within [0, 1], got {}",
                self.min_relevance_score
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Context chunks fed into the reply prompt.
    #[serde(default = "default_context_top_k")]
    pub context_top_k: usize,

    /// Channel capacity for streamed reply chunks.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

fn default_context_top_k() -> usize {
    4
}

fn default_stream_buffer() -> usize {
    32
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_top_k: default_context_top_k(),
            stream_buffer: default_stream_buffer(),
        }
    }
}
