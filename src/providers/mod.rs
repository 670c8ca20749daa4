//! LLM provider capability traits and backend selection.
//!
//! Two narrow capabilities are consumed by the core: turning text into
//! vectors ([`Embedder`]) and turning message history into generated text
//! ([`Completer`]). Each backend implements both; which backend is used is
//! decided by configuration, not by branching on strings at call sites.

mod gemini;
mod ollama;
mod openai;
mod openai_compat;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use openai_compat::OpenAiCompatClient;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::models::{ChatMessage, ProviderConfig, ProviderKind};

/// Receiver half of a streamed completion. Dropping it cancels the
/// upstream provider request.
pub type CompletionStream = mpsc::Receiver<Result<String, ProviderError>>;

/// Capability: text → fixed-length numeric vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts in one request.
    ///
    /// Returns one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

/// Capability: message history → generated text.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Generate a complete response.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;

    /// Generate a response as an incremental token stream.
    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<CompletionStream, ProviderError>;
}

/// Both capabilities of one configured backend.
#[derive(Clone)]
pub struct ProviderHandle {
    pub embedder: Arc<dyn Embedder>,
    pub completer: Arc<dyn Completer>,
}

/// Build the backend selected by configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<ProviderHandle, ProviderError> {
    match config.kind {
        ProviderKind::Ollama => {
            let provider = Arc::new(OllamaProvider::new(config)?);
            Ok(ProviderHandle {
                embedder: provider.clone(),
                completer: provider,
            })
        }
        ProviderKind::OpenAi => {
            let provider = Arc::new(OpenAiProvider::new(config)?);
            Ok(ProviderHandle {
                embedder: provider.clone(),
                completer: provider,
            })
        }
        ProviderKind::Gemini => {
            let provider = Arc::new(GeminiProvider::new(config)?);
            Ok(ProviderHandle {
                embedder: provider.clone(),
                completer: provider,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderConfig;

    #[test]
    fn test_create_provider_by_kind() {
        for kind in [ProviderKind::Ollama, ProviderKind::OpenAi, ProviderKind::Gemini] {
            let config = ProviderConfig {
                kind,
                api_key: Some("test-key".into()),
                ..Default::default()
            };
            assert!(create_provider(&config).is_ok(), "provider {kind} failed");
        }
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = ProviderConfig {
            kind: ProviderKind::OpenAi,
            api_key: None,
            ..Default::default()
        };
        assert!(create_provider(&config).is_err());
    }
}
