//! End-to-end pipeline tests: ingest documents into an in-memory store,
//! search them iteratively, and drive a grounded chat reply over the result.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use ragkit::chat::{ChatSessionManager, MemorySessionStore};
use ragkit::error::ProviderError;
use ragkit::ingest::{DocumentLoader, IngestionPipeline};
use ragkit::models::{
    ChatConfig, ChatMessage, IngestionConfig, Role, ScoredChunk, SearchConfig, SearchStatus,
    Source,
};
use ragkit::providers::{Completer, CompletionStream, Embedder};
use ragkit::search::{Evaluation, Evaluator, SearchOrchestrator};
use ragkit::store::{MemoryStore, VectorStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ragkit=debug")
        .with_test_writer()
        .try_init();
}

/// Deterministic embedder: vectors depend only on text length and byte sum,
/// so identical text always lands at the same point.
struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts
            .iter()
            .map(|t| {
                let sum: u32 = t.bytes().map(u32::from).sum();
                vec![t.len() as f32, (sum % 997) as f32, 1.0]
            })
            .collect())
    }
}

/// Accepts every query on the first evaluation with a fixed score.
struct AcceptingEvaluator {
    score: f64,
}

#[async_trait]
impl Evaluator for AcceptingEvaluator {
    async fn evaluate(
        &self,
        _query: &str,
        chunks: &[ScoredChunk],
        _iteration: u32,
    ) -> Result<Evaluation, ProviderError> {
        Ok(Evaluation {
            score: self.score,
            analysis: format!("saw {} chunks", chunks.len()),
            refined_query: None,
        })
    }
}

/// Streams a fixed token sequence for every completion request.
struct FixedCompleter {
    tokens: Vec<String>,
}

#[async_trait]
impl Completer for FixedCompleter {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        Ok(self.tokens.concat())
    }

    async fn complete_stream(
        &self,
        _messages: &[ChatMessage],
    ) -> Result<CompletionStream, ProviderError> {
        let (tx, rx) = mpsc::channel(8);
        let tokens = self.tokens.clone();
        tokio::spawn(async move {
            for token in tokens {
                if tx.send(Ok(token)).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

fn write_corpus(dir: &tempfile::TempDir) -> Result<()> {
    std::fs::write(
        dir.path().join("tokio.md"),
        "# Tokio\n\nTokio is an asynchronous runtime for Rust built on top of \
         non-blocking I/O. Tasks are lightweight and scheduled cooperatively.",
    )?;
    std::fs::write(
        dir.path().join("qdrant.md"),
        "# Qdrant\n\nQdrant is a vector database. Collections hold points with \
         payloads and fixed-dimension embeddings compared by cosine similarity.",
    )?;
    std::fs::write(
        dir.path().join("sqlite.md"),
        "# SQLite\n\nSQLite is an embedded relational database. A single file \
         holds the whole database and transactions are fully ACID.",
    )?;
    Ok(())
}

fn build_pipeline(store: Arc<MemoryStore>) -> Result<IngestionPipeline> {
    let config = IngestionConfig {
        chunk_size: 120,
        chunk_overlap: 20,
        max_concurrency: 2,
        embed_batch_size: 4,
        ..IngestionConfig::default()
    };
    let loader = Arc::new(DocumentLoader::new(&config)?);
    Ok(IngestionPipeline::new(
        config,
        loader,
        Arc::new(HashEmbedder),
        store,
        None,
    )?)
}

#[tokio::test]
async fn ingest_directory_then_search() -> Result<()> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    write_corpus(&dir)?;

    let store = Arc::new(MemoryStore::new("e2e"));
    let pipeline = build_pipeline(store.clone())?;

    let report = pipeline
        .ingest(vec![Source::file(dir.path().display().to_string())])
        .await?;
    assert_eq!(report.sources_succeeded, 1);
    assert_eq!(report.sources_failed, 0);
    assert_eq!(report.documents_loaded, 3);
    assert!(report.chunks_written >= 3);
    assert_eq!(store.count().await?, report.chunks_written as u64);

    let orchestrator = SearchOrchestrator::new(
        SearchConfig {
            top_k: 2,
            max_iterations: 3,
            min_relevance_score: 0.7,
        },
        Arc::new(HashEmbedder),
        store,
        Arc::new(AcceptingEvaluator { score: 0.9 }),
    )?;

    let outcome = orchestrator.search("what is a vector database?").await?;
    assert_eq!(outcome.status, SearchStatus::Accepted);
    assert_eq!(outcome.iteration_count(), 1);
    assert_eq!(outcome.best_chunks.len(), 2);
    assert!(outcome.best_score >= 0.7);

    Ok(())
}

#[tokio::test]
async fn reingest_is_idempotent() -> Result<()> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    write_corpus(&dir)?;

    let store = Arc::new(MemoryStore::new("e2e"));
    let pipeline = build_pipeline(store.clone())?;
    let source = Source::file(dir.path().display().to_string());

    let first = pipeline.ingest(vec![source.clone()]).await?;
    let second = pipeline.ingest(vec![source]).await?;

    assert_eq!(first.chunks_written, second.chunks_written);
    assert_eq!(store.count().await?, first.chunks_written as u64);

    Ok(())
}

#[tokio::test]
async fn chat_reply_is_grounded_and_committed() -> Result<()> {
    init_tracing();

    let dir = tempfile::tempdir()?;
    write_corpus(&dir)?;

    let store = Arc::new(MemoryStore::new("e2e"));
    let pipeline = build_pipeline(store.clone())?;
    pipeline
        .ingest(vec![Source::file(dir.path().display().to_string())])
        .await?;

    let orchestrator = Arc::new(SearchOrchestrator::new(
        SearchConfig::default(),
        Arc::new(HashEmbedder),
        store,
        Arc::new(AcceptingEvaluator { score: 0.8 }),
    )?);
    let completer = Arc::new(FixedCompleter {
        tokens: vec!["Qdrant ".into(), "stores ".into(), "vectors.".into()],
    });
    let manager = ChatSessionManager::new(
        ChatConfig::default(),
        Arc::new(MemorySessionStore::new()),
        completer,
        orchestrator,
    );

    let session_id = manager.create_session().await?;
    manager
        .append_user(&session_id, "what does qdrant store?")
        .await?;

    let mut reply = manager.generate_reply(&session_id).await?;
    let mut streamed = String::new();
    while let Some(token) = reply.tokens.recv().await {
        streamed.push_str(&token.map_err(|e| anyhow::anyhow!(e.to_string()))?);
    }
    reply.handle.await??;

    assert_eq!(streamed, "Qdrant stores vectors.");

    let history = manager.get_history(&session_id).await?;
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[1].role, Role::Assistant);
    assert_eq!(history.messages[1].content, "Qdrant stores vectors.");

    let stats = manager.get_token_stats(&session_id).await?;
    assert_eq!(stats.message_count, 2);
    assert!(stats.assistant_tokens > 0);

    Ok(())
}
