//! In-memory vector store, used by tests and as a zero-dependency fallback.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CollectionInfo, VectorStore};
use crate::error::StorageError;
use crate::models::{Chunk, ScoredChunk};

/// Brute-force cosine-similarity store keyed by chunk ID.
pub struct MemoryStore {
    collection: String,
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl MemoryStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            chunks: RwLock::new(HashMap::new()),
        }
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(true)
    }

    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, StorageError> {
        let chunks = self.chunks.read().await;
        Ok(Some(CollectionInfo {
            points_count: chunks.len() as u64,
        }))
    }

    async fn create_collection(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn upsert_chunks(&self, new_chunks: Vec<Chunk>) -> Result<(), StorageError> {
        let mut chunks = self.chunks.write().await;
        for chunk in new_chunks {
            chunks.insert(chunk.id.clone(), chunk);
        }
        Ok(())
    }

    async fn query(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredChunk>, StorageError> {
        let chunks = self.chunks.read().await;

        let mut scored: Vec<ScoredChunk> = chunks
            .values()
            .map(|chunk| ScoredChunk {
                chunk_id: chunk.id.clone(),
                score: Self::cosine_similarity(&query_vector, &chunk.embedding),
                content: chunk.content.clone(),
                source: chunk.source.clone(),
                chunk_index: chunk.chunk_index,
                content_hash: chunk.content_hash.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit as usize);
        Ok(scored)
    }

    async fn delete_by_source_ids(&self, source_ids: &[String]) -> Result<(), StorageError> {
        let mut chunks = self.chunks.write().await;
        chunks.retain(|_, chunk| !source_ids.contains(&chunk.source_id));
        Ok(())
    }

    async fn clear_collection(&self) -> Result<(), StorageError> {
        let mut chunks = self.chunks.write().await;
        chunks.clear();
        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let chunks = self.chunks.read().await;
        Ok(chunks.len() as u64)
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
