pub mod chat;
pub mod error;
pub mod ingest;
pub mod models;
pub mod providers;
pub mod search;
pub mod store;
pub mod utils;

pub use chat::{ChatSessionManager, ReplyStream};
pub use error::{ChatError, ConfigError, IngestError, LoadError, ProviderError, SearchError, StorageError};
pub use ingest::{IngestionPipeline, IngestionReport};
pub use models::Config;
pub use search::SearchOrchestrator;
