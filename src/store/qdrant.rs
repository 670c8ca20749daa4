//! Qdrant vector store backend.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use std::collections::HashMap;

use super::{CollectionInfo, VectorStore};
use crate::error::StorageError;
use crate::models::{Chunk, ScoredChunk, Source, SourceKind, VectorStoreConfig};

/// Qdrant-backed vector store.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    embedding_dim: u64,
}

impl QdrantStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, StorageError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            embedding_dim: config.embedding_dim,
        })
    }

    fn payload_str(
        payload: &HashMap<String, qdrant_client::qdrant::Value>,
        key: &str,
    ) -> Option<String> {
        payload.get(key).and_then(|v| match &v.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn payload_int(
        payload: &HashMap<String, qdrant_client::qdrant::Value>,
        key: &str,
    ) -> Option<i64> {
        payload.get(key).and_then(|v| match &v.kind {
            Some(qdrant_client::qdrant::value::Kind::IntegerValue(n)) => Some(*n),
            _ => None,
        })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn health_check(&self) -> Result<bool, StorageError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| StorageError::ConnectionError(e.to_string()))
    }

    async fn get_collection_info(&self) -> Result<Option<CollectionInfo>, StorageError> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => Ok(Some(CollectionInfo {
                points_count: info.result.map_or(0, |r| r.points_count.unwrap_or(0)),
            })),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(None)
                } else {
                    Err(StorageError::CollectionError(msg))
                }
            }
        }
    }

    async fn create_collection(&self) -> Result<(), StorageError> {
        if self.get_collection_info().await?.is_some() {
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(self.embedding_dim, Distance::Cosine),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| StorageError::CollectionError(e.to_string()))?;

        Ok(())
    }

    async fn upsert_chunks(&self, chunks: Vec<Chunk>) -> Result<(), StorageError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = chunks
            .into_iter()
            .map(|chunk| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert("source_id".to_string(), chunk.source_id.into());
                payload.insert("source_kind".to_string(), chunk.source.kind.to_string().into());
                payload.insert("source_location".to_string(), chunk.source.location.into());
                payload.insert("content".to_string(), chunk.content.into());
                payload.insert(
                    "chunk_index".to_string(),
                    i64::from(chunk.chunk_index).into(),
                );
                payload.insert(
                    "total_chunks".to_string(),
                    i64::from(chunk.total_chunks).into(),
                );
                payload.insert("start_offset".to_string(), (chunk.start_offset as i64).into());
                payload.insert("end_offset".to_string(), (chunk.end_offset as i64).into());
                payload.insert("content_hash".to_string(), chunk.content_hash.into());
                payload.insert("cleaned".to_string(), chunk.cleaned.into());
                payload.insert("retrieved_at".to_string(), chunk.retrieved_at.into());

                PointStruct::new(chunk.id, chunk.embedding, payload)
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(&self.collection, points);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| StorageError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn query(
        &self,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredChunk>, StorageError> {
        let search_builder =
            SearchPointsBuilder::new(&self.collection, query_vector, limit).with_payload(true);

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let scored: Vec<ScoredChunk> = results
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;

                let content = Self::payload_str(&payload, "content").unwrap_or_default();
                let content_hash = Self::payload_str(&payload, "content_hash").unwrap_or_default();
                let location = Self::payload_str(&payload, "source_location").unwrap_or_default();
                let kind = Self::payload_str(&payload, "source_kind")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(SourceKind::File);
                let chunk_index =
                    Self::payload_int(&payload, "chunk_index").unwrap_or(0) as u32;

                let chunk_id = match &point.id {
                    Some(id) => match &id.point_id_options {
                        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)) => {
                            uuid.clone()
                        }
                        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)) => {
                            num.to_string()
                        }
                        None => String::new(),
                    },
                    None => String::new(),
                };

                ScoredChunk {
                    chunk_id,
                    score: point.score,
                    content,
                    source: Source {
                        kind,
                        location,
                    },
                    chunk_index,
                    content_hash,
                }
            })
            .collect();

        Ok(scored)
    }

    async fn delete_by_source_ids(&self, source_ids: &[String]) -> Result<(), StorageError> {
        if source_ids.is_empty() {
            return Ok(());
        }

        let conditions: Vec<Condition> = source_ids
            .iter()
            .map(|id| Condition::matches("source_id", id.clone()))
            .collect();

        let filter = Filter::should(conditions);
        let delete = DeletePointsBuilder::new(&self.collection).points(filter);

        self.client
            .delete_points(delete)
            .await
            .map_err(|e| StorageError::DeleteError(e.to_string()))?;

        Ok(())
    }

    async fn clear_collection(&self) -> Result<(), StorageError> {
        if self.get_collection_info().await?.is_none() {
            return Ok(());
        }

        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| StorageError::DeleteError(e.to_string()))?;

        self.create_collection().await?;

        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self
            .get_collection_info()
            .await?
            .map_or(0, |info| info.points_count))
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
