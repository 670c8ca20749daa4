//! Ingestion pipeline: load, clean, chunk, embed, store.

mod chunker;
mod cleaner;
mod loader;

pub use chunker::Chunker;
pub use cleaner::ContentCleaner;
pub use loader::{DocumentLoader, Loader};

use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

use crate::error::IngestError;
use crate::models::{IngestionConfig, Source};
use crate::providers::Embedder;
use crate::store::VectorStore;
use crate::utils::{RetryConfig, with_retry};

/// Aggregated outcome of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    /// One `(source, reason)` pair per failed source.
    pub failures: Vec<(String, String)>,
    pub documents_loaded: usize,
    pub chunks_written: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct SourceStats {
    documents: usize,
    chunks: usize,
}

/// Drives sources through load, optional cleaning, chunking, batched
/// embedding, and storage. Sources are processed concurrently up to
/// `max_concurrency`; a failing source never aborts the others.
pub struct IngestionPipeline {
    config: IngestionConfig,
    loader: Arc<dyn Loader>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    cleaner: Option<Arc<ContentCleaner>>,
    retry: RetryConfig,
}

impl IngestionPipeline {
    /// Validates the configuration before any work can start.
    pub fn new(
        config: IngestionConfig,
        loader: Arc<dyn Loader>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        cleaner: Option<Arc<ContentCleaner>>,
    ) -> Result<Self, crate::error::ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            loader,
            embedder,
            store,
            cleaner,
            retry: RetryConfig::default(),
        })
    }

    /// Ingest all sources and report per-source outcomes.
    ///
    /// When `cleanup_collection` is set, the collection is cleared completely
    /// before any source task is spawned, so cleanup and writes never
    /// interleave.
    pub async fn ingest(&self, sources: Vec<Source>) -> Result<IngestionReport, IngestError> {
        let started = Instant::now();

        self.store.create_collection().await?;
        if self.config.cleanup_collection {
            tracing::info!(collection = self.store.collection(), "clearing collection");
            self.store.clear_collection().await?;
        }

        let mut report = IngestionReport::default();
        let mut pending = sources.into_iter();
        let mut join_set: JoinSet<(String, Result<SourceStats, IngestError>)> = JoinSet::new();

        loop {
            while join_set.len() < self.config.max_concurrency {
                let Some(source) = pending.next() else { break };
                let loader = Arc::clone(&self.loader);
                let embedder = Arc::clone(&self.embedder);
                let store = Arc::clone(&self.store);
                let cleaner = self.cleaner.clone();
                let config = self.config.clone();
                let retry = self.retry.clone();

                join_set.spawn(async move {
                    let label = source.to_string();
                    let result =
                        process_source(source, loader, embedder, store, cleaner, config, retry)
                            .await;
                    (label, result)
                });
            }

            match join_set.join_next().await {
                Some(Ok((label, Ok(stats)))) => {
                    tracing::info!(
                        source = %label,
                        documents = stats.documents,
                        chunks = stats.chunks,
                        "source ingested"
                    );
                    report.sources_succeeded += 1;
                    report.documents_loaded += stats.documents;
                    report.chunks_written += stats.chunks;
                }
                Some(Ok((label, Err(e)))) => {
                    tracing::warn!(source = %label, error = %e, "source failed");
                    report.sources_failed += 1;
                    report.failures.push((label, e.to_string()));
                }
                Some(Err(join_error)) => {
                    report.sources_failed += 1;
                    report
                        .failures
                        .push(("<task>".to_string(), join_error.to_string()));
                }
                None => break,
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            succeeded = report.sources_succeeded,
            failed = report.sources_failed,
            chunks = report.chunks_written,
            duration_ms = report.duration_ms,
            "ingestion finished"
        );
        Ok(report)
    }
}

async fn process_source(
    source: Source,
    loader: Arc<dyn Loader>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    cleaner: Option<Arc<ContentCleaner>>,
    config: IngestionConfig,
    retry: RetryConfig,
) -> Result<SourceStats, IngestError> {
    let mut documents = loader.load(&source).await?;
    let chunker = Chunker::new(&config);
    let mut stats = SourceStats {
        documents: documents.len(),
        chunks: 0,
    };

    for document in &mut documents {
        if config.clean_content
            && let Some(cleaner) = &cleaner
        {
            cleaner.clean(document).await;
        }

        let mut chunks = chunker.chunk(document);
        if chunks.is_empty() {
            continue;
        }

        for batch in chunks.chunks_mut(config.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let embeddings = with_retry(&retry, || embedder.embed(&texts)).await?;

            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }

            let to_store = batch.to_vec();
            with_retry(&retry, || store.upsert_chunks(to_store.clone())).await?;

            stats.chunks += batch.len();
        }
    }

    Ok(stats)
}
