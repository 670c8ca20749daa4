mod config;
mod document;
mod search;
mod session;
mod source;

pub use config::{
    ChatConfig, Config, DEFAULT_COLLECTION, DEFAULT_GEMINI_URL, DEFAULT_OLLAMA_URL,
    DEFAULT_OPENAI_URL, DEFAULT_QDRANT_URL, IngestionConfig, ProviderConfig, ProviderKind,
    SearchConfig, VectorStoreConfig,
};
pub use document::{Chunk, Document, ScoredChunk};
pub use search::{SearchIteration, SearchOutcome, SearchStatus};
pub use session::{ChatMessage, ChatSession, Role, TokenStats, estimate_tokens};
pub use source::{Source, SourceKind};
