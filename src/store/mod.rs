//! Vector store abstraction layer.
//!
//! A trait-based abstraction over vector store backends, so the ingestion
//! pipeline and the search orchestrator never depend on a concrete store.

mod memory;
mod qdrant;

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::{Chunk, ScoredChunk, VectorStoreConfig};

/// Collection information.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
}

/// Abstract trait for vector store operations.
///
/// All backends must implement this trait to enable backend-agnostic
/// storage throughout the pipeline. Upserts are keyed by deterministic
/// chunk IDs, so re-ingesting the same content never duplicates records.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check that the store is reachable.
    async fn health_check(&self) -> Result<bool, StorageError>;

    /// Get information about the collection. Returns None if it doesn't exist.
    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, StorageError>;

    /// Create the collection if it doesn't exist.
    async fn create_collection(&self) -> Result<(), StorageError>;

    /// Insert or update embedded chunks, keyed by chunk ID.
    async fn upsert_chunks(&self, chunks: Vec<Chunk>) -> Result<(), StorageError>;

    /// Return the `limit` most similar chunks to the query vector,
    /// ordered by descending similarity.
    async fn query(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredChunk>, StorageError>;

    /// Delete all chunks belonging to the given source IDs.
    async fn delete_by_source_ids(&self, source_ids: &[String]) -> Result<(), StorageError>;

    /// Remove every chunk from the collection, leaving it empty but usable.
    async fn clear_collection(&self) -> Result<(), StorageError>;

    /// Number of chunks currently stored.
    async fn count(&self) -> Result<u64, StorageError>;

    /// Get the collection name.
    fn collection(&self) -> &str;
}

/// Create a vector store backend from configuration.
pub fn create_store(config: &VectorStoreConfig) -> Result<Box<dyn VectorStore>, StorageError> {
    let store = QdrantStore::new(config)?;
    Ok(Box::new(store))
}
