//! Iterative self-refining search.

mod evaluator;

pub use evaluator::{Evaluation, Evaluator, LlmEvaluator};

use std::sync::Arc;

use crate::error::SearchError;
use crate::models::{SearchConfig, SearchIteration, SearchOutcome, SearchStatus};
use crate::providers::Embedder;
use crate::store::VectorStore;

/// Runs the retrieve/evaluate/refine loop until the evaluator accepts the
/// results or the iteration budget runs out.
pub struct SearchOrchestrator {
    config: SearchConfig,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    evaluator: Arc<dyn Evaluator>,
}

impl SearchOrchestrator {
    pub fn new(
        config: SearchConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Self, crate::error::ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            embedder,
            store,
            evaluator,
        })
    }

    /// Search for `query`, refining it between iterations.
    ///
    /// Sparse or empty retrieval is not a failure; the evaluator still runs
    /// and can refine the query. A provider or storage failure mid-loop
    /// degrades to the best iteration recorded so far; only a loop that
    /// records nothing at all errors out.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery("query is empty".into()));
        }

        tracing::info!(
            query,
            max_iterations = self.config.max_iterations,
            min_relevance_score = self.config.min_relevance_score,
            "starting iterative search"
        );

        let mut iterations: Vec<SearchIteration> = Vec::new();
        let mut current_query = query.to_string();
        let mut status = SearchStatus::Exhausted;

        for iteration in 1..=self.config.max_iterations {
            match self.run_iteration(&current_query, iteration).await {
                Ok(record) => {
                    let accepted = record.relevance_score >= self.config.min_relevance_score;
                    tracing::info!(
                        iteration,
                        query = %record.query,
                        score = record.relevance_score,
                        accepted,
                        "iteration evaluated"
                    );

                    let next_query = record
                        .refined_query
                        .clone()
                        .unwrap_or_else(|| current_query.clone());
                    iterations.push(record);

                    if accepted {
                        status = SearchStatus::Accepted;
                        break;
                    }
                    current_query = next_query;
                }
                Err(e) => {
                    tracing::warn!(iteration, error = %e, "iteration failed");
                    if iterations.is_empty() {
                        return Err(SearchError::NoIterationSucceeded(e.to_string()));
                    }
                    break;
                }
            }
        }

        let best = iterations
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.relevance_score
                    .partial_cmp(&b.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        let final_query = iterations
            .last()
            .map(|it| it.query.clone())
            .unwrap_or_else(|| query.to_string());

        let outcome = SearchOutcome {
            original_query: query.to_string(),
            final_query,
            best_chunks: iterations[best].chunks.clone(),
            best_score: iterations[best].relevance_score,
            iterations,
            status,
        };

        tracing::info!(
            best_score = outcome.best_score,
            iterations = outcome.iteration_count(),
            status = ?outcome.status,
            "search completed"
        );
        Ok(outcome)
    }

    async fn run_iteration(
        &self,
        query: &str,
        iteration: u32,
    ) -> Result<SearchIteration, SearchError> {
        let query_text = query.to_string();
        let embeddings = self
            .embedder
            .embed(std::slice::from_ref(&query_text))
            .await?;
        let vector = embeddings.into_iter().next().ok_or_else(|| {
            SearchError::Provider(crate::error::ProviderError::InvalidResponse(
                "embedder returned no vector for the query".into(),
            ))
        })?;

        let chunks = self.store.query(vector, self.config.top_k).await?;
        tracing::debug!(iteration, retrieved = chunks.len(), "retrieval pass");

        let evaluation = self.evaluator.evaluate(query, &chunks, iteration).await?;

        Ok(SearchIteration {
            query: query.to_string(),
            chunks,
            relevance_score: evaluation.score,
            analysis: evaluation.analysis,
            refined_query: evaluation.refined_query,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::{Chunk, Document, Source};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    /// Evaluator that replays a scripted sequence of verdicts.
    struct ScriptedEvaluator {
        script: Mutex<VecDeque<Result<Evaluation, ProviderError>>>,
    }

    impl ScriptedEvaluator {
        fn new(script: Vec<Result<Evaluation, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl Evaluator for ScriptedEvaluator {
        async fn evaluate(
            &self,
            _query: &str,
            _chunks: &[crate::models::ScoredChunk],
            _iteration: u32,
        ) -> Result<Evaluation, ProviderError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProviderError::InvalidResponse("script empty".into())))
        }
    }

    fn verdict(score: f64, refined: Option<&str>) -> Result<Evaluation, ProviderError> {
        Ok(Evaluation {
            score,
            analysis: format!("score {score}"),
            refined_query: refined.map(String::from),
        })
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::default());
        let doc = Document::new(Source::file("/a.md"), "indexed content".into(), None);
        let mut chunk = Chunk::from_document(&doc, "indexed content".into(), 0, 1, 0, 15);
        chunk.embedding = vec![1.0, 0.0];
        store.upsert_chunks(vec![chunk]).await.unwrap();
        store
    }

    fn orchestrator(
        max_iterations: u32,
        store: Arc<MemoryStore>,
        script: Vec<Result<Evaluation, ProviderError>>,
    ) -> SearchOrchestrator {
        SearchOrchestrator::new(
            SearchConfig {
                max_iterations,
                ..Default::default()
            },
            Arc::new(FixedEmbedder),
            store,
            Arc::new(ScriptedEvaluator::new(script)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_accepts_on_first_iteration() {
        let store = seeded_store().await;
        let orch = orchestrator(3, store, vec![verdict(0.9, None)]);

        let outcome = orch.search("what is indexed").await.unwrap();
        assert!(outcome.accepted());
        assert_eq!(outcome.iteration_count(), 1);
        assert_eq!(outcome.final_query, "what is indexed");
        assert_eq!(outcome.best_chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_refines_until_accepted() {
        let store = seeded_store().await;
        let orch = orchestrator(
            3,
            store,
            vec![
                verdict(0.3, Some("refined one")),
                verdict(0.5, Some("refined two")),
                verdict(0.9, None),
            ],
        );

        let outcome = orch.search("original").await.unwrap();
        assert!(outcome.accepted());
        assert_eq!(outcome.iteration_count(), 3);
        assert_eq!(outcome.original_query, "original");
        // The third pass ran with the refinement suggested by the second.
        assert_eq!(outcome.final_query, "refined two");
        assert_eq!(outcome.iterations[1].query, "refined one");
        assert!((outcome.best_score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_exhausts_iteration_budget() {
        let store = seeded_store().await;
        let orch = orchestrator(
            2,
            store,
            vec![verdict(0.1, Some("try again")), verdict(0.2, None)],
        );

        let outcome = orch.search("query").await.unwrap();
        assert_eq!(outcome.status, SearchStatus::Exhausted);
        assert_eq!(outcome.iteration_count(), 2);
        assert!((outcome.best_score - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_refinement_reuses_query() {
        let store = seeded_store().await;
        let orch = orchestrator(2, store, vec![verdict(0.3, None), verdict(0.8, None)]);

        let outcome = orch.search("stable query").await.unwrap();
        assert!(outcome.accepted());
        assert_eq!(outcome.iterations[1].query, "stable query");
    }

    #[tokio::test]
    async fn test_evaluator_failure_degrades_to_best() {
        let store = seeded_store().await;
        let orch = orchestrator(
            3,
            store,
            vec![
                verdict(0.4, Some("second")),
                Err(ProviderError::ConnectionError("down".into())),
            ],
        );

        let outcome = orch.search("query").await.unwrap();
        assert_eq!(outcome.status, SearchStatus::Exhausted);
        assert_eq!(outcome.iteration_count(), 1);
        assert!((outcome.best_score - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_total_failure_errors() {
        let store = seeded_store().await;
        let orch = orchestrator(
            3,
            store,
            vec![Err(ProviderError::ConnectionError("down".into()))],
        );

        let result = orch.search("query").await;
        assert!(matches!(result, Err(SearchError::NoIterationSucceeded(_))));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let store = seeded_store().await;
        let orch = orchestrator(3, store, vec![]);
        assert!(matches!(
            orch.search("   ").await,
            Err(SearchError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_sparse_retrieval_is_not_a_failure() {
        let store = Arc::new(MemoryStore::default());
        let orch = orchestrator(1, store, vec![verdict(0.9, None)]);

        let outcome = orch.search("query over empty store").await.unwrap();
        assert!(outcome.accepted());
        assert!(outcome.best_chunks.is_empty());
    }
}
