//! Error types for the RAG engine.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to loading documents from sources.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file read error: {0}")]
    FileReadError(String),

    #[error("directory walk error: {0}")]
    WalkError(String),

    #[error("fetch error for {url}: {reason}")]
    FetchError { url: String, reason: String },

    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("empty document from {0}")]
    EmptyDocument(String),
}

/// Errors from LLM providers (embedding, completion, evaluation).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to connect to provider: {0}")]
    ConnectionError(String),

    #[error("provider returned an error: {0}")]
    ServerError(String),

    #[error("provider request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("authentication failed: {0}")]
    AuthError(String),

    #[error("provider request timed out")]
    Timeout,

    #[error("provider stream closed unexpectedly")]
    StreamClosed,
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::ConnectionError(_) | ProviderError::Timeout => true,
            ProviderError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            ProviderError::RequestError(e) => e.is_timeout() || e.is_connect(),
            ProviderError::InvalidResponse(_)
            | ProviderError::AuthError(_)
            | ProviderError::StreamClosed => false,
        }
    }
}

/// Errors related to vector store and session store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("session store error: {0}")]
    SessionError(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl Retryable for StorageError {
    fn is_retryable(&self) -> bool {
        match self {
            StorageError::ConnectionError(_) => true,
            StorageError::NotFound(_) => false,
            StorageError::CollectionError(msg)
            | StorageError::UpsertError(msg)
            | StorageError::QueryError(msg)
            | StorageError::DeleteError(msg)
            | StorageError::SessionError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Error recorded for a single source during ingestion.
///
/// Per-source failures are aggregated into the report, never raised.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the search orchestrator.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("no search iteration succeeded: {0}")]
    NoIterationSucceeded(String),
}

/// Errors from chat session operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session has no user message to answer")]
    NoUserMessage,

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("reply stream cancelled")]
    Cancelled,
}
