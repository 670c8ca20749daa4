//! Search loop models: iterations, outcomes, and terminal states.

use serde::{Deserialize, Serialize};

use super::document::ScoredChunk;

/// Terminal state of the iterative search loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    /// An iteration met the relevance threshold.
    Accepted,
    /// The iteration budget ran out before the threshold was met.
    Exhausted,
}

/// One pass of the retrieval/evaluation loop. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIteration {
    /// Query used for this pass.
    pub query: String,
    /// Chunks retrieved for the query, best first.
    pub chunks: Vec<ScoredChunk>,
    /// Evaluator relevance judgment in [0, 1].
    pub relevance_score: f64,
    /// Evaluator's short analysis of the result quality.
    pub analysis: String,
    /// Suggested replacement query, when the score fell below threshold.
    pub refined_query: Option<String>,
}

/// Final result of a top-level search call, with the full iteration trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub original_query: String,
    pub final_query: String,
    /// Chunk set of the best-scoring iteration.
    pub best_chunks: Vec<ScoredChunk>,
    pub best_score: f64,
    /// Every recorded pass, in order. Never empty.
    pub iterations: Vec<SearchIteration>,
    pub status: SearchStatus,
}

impl SearchOutcome {
    /// Number of retrieval/evaluation passes performed.
    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }

    pub fn accepted(&self) -> bool {
        self.status == SearchStatus::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&SearchStatus::Accepted).unwrap();
        assert_eq!(json, "\"accepted\"");
        let parsed: SearchStatus = serde_json::from_str("\"exhausted\"").unwrap();
        assert_eq!(parsed, SearchStatus::Exhausted);
    }

    #[test]
    fn test_outcome_helpers() {
        let outcome = SearchOutcome {
            original_query: "q".into(),
            final_query: "q2".into(),
            best_chunks: vec![],
            best_score: 0.9,
            iterations: vec![SearchIteration {
                query: "q".into(),
                chunks: vec![],
                relevance_score: 0.9,
                analysis: "good".into(),
                refined_query: None,
            }],
            status: SearchStatus::Accepted,
        };
        assert_eq!(outcome.iteration_count(), 1);
        assert!(outcome.accepted());
    }
}
