//! Ollama backend, served over its OpenAI-compatible endpoint.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::{ChatMessage, ProviderConfig};

use super::openai_compat::OpenAiCompatClient;
use super::{Completer, CompletionStream, Embedder};

/// Local Ollama server. No API key required.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: OpenAiCompatClient,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = OpenAiCompatClient::new(
            &config.base_url(),
            // Ollama ignores the key; send one only if configured
            config.api_key.clone(),
            &config.chat_model,
            &config.embedding_model,
            config.timeout_secs,
        )?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Embedder for OllamaProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.client.embeddings(texts).await
    }
}

#[async_trait]
impl Completer for OllamaProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.client.chat(messages).await
    }

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<CompletionStream, ProviderError> {
        self.client.chat_stream(messages).await
    }
}
