//! LLM-based relevance evaluation of retrieved chunks.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ProviderError;
use crate::models::{ChatMessage, ScoredChunk};
use crate::providers::Completer;
use crate::utils::{strip_code_fence, strip_think_tags, truncate_chars};

/// Evaluator verdict on one retrieval pass.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Relevance in [0, 1], clamped on parse.
    pub score: f64,
    pub analysis: String,
    /// Suggested replacement query, None when the current one is considered optimal.
    pub refined_query: Option<String>,
}

/// Judges retrieved chunks against the query and proposes refinements.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        query: &str,
        chunks: &[ScoredChunk],
        iteration: u32,
    ) -> Result<Evaluation, ProviderError>;
}

const EVALUATION_SYSTEM_PROMPT: &str = "\
You are a search quality analyst. Respond with a single JSON object and \
nothing else: {\"score\": <number between 0.0 and 1.0>, \"analysis\": \
\"<one or two sentences>\", \"refined_query\": \"<better query>\" or null}. \
Use null for refined_query when the current results are already optimal.";

/// Evaluator backed by a chat completion with a strict JSON contract.
pub struct LlmEvaluator {
    completer: Arc<dyn Completer>,
}

#[derive(Deserialize)]
struct EvaluationWire {
    score: f64,
    #[serde(default)]
    analysis: Option<String>,
    #[serde(default)]
    refined_query: Option<String>,
}

impl LlmEvaluator {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    fn build_prompt(query: &str, chunks: &[ScoredChunk], iteration: u32) -> String {
        let context = if chunks.is_empty() {
            "No results found".to_string()
        } else {
            chunks
                .iter()
                .enumerate()
                .map(|(i, chunk)| {
                    format!(
                        "Document {}:\nContent: {}\nSource: {}\n---",
                        i + 1,
                        truncate_chars(&chunk.content, 200),
                        chunk.source
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "Analyze these search results for the query: \"{query}\"\n\n\
             Search iteration: {iteration}\n\
             Context from search:\n{context}"
        )
    }

    fn parse(raw: &str) -> Result<Evaluation, ProviderError> {
        let stripped = strip_think_tags(raw);
        let body = strip_code_fence(&stripped);

        let wire: EvaluationWire = serde_json::from_str(body).map_err(|e| {
            ProviderError::InvalidResponse(format!("evaluation is not valid JSON: {e}"))
        })?;

        let refined_query = wire
            .refined_query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty() && !q.eq_ignore_ascii_case("none"));

        Ok(Evaluation {
            score: wire.score.clamp(0.0, 1.0),
            analysis: wire.analysis.unwrap_or_else(|| "No analysis provided".to_string()),
            refined_query,
        })
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        query: &str,
        chunks: &[ScoredChunk],
        iteration: u32,
    ) -> Result<Evaluation, ProviderError> {
        let messages = [
            ChatMessage::system(EVALUATION_SYSTEM_PROMPT),
            ChatMessage::user(Self::build_prompt(query, chunks, iteration)),
        ];

        let response = self.completer.complete(&messages).await?;
        Self::parse(&response)
    }
}
