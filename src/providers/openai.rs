//! OpenAI backend.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::{ChatMessage, ProviderConfig};

use super::openai_compat::OpenAiCompatClient;
use super::{Completer, CompletionStream, Embedder};

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: OpenAiCompatClient,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::AuthError("OPENAI_API_KEY is not set".to_string()))?;

        let client = OpenAiCompatClient::new(
            &config.base_url(),
            Some(api_key),
            &config.chat_model,
            &config.embedding_model,
            config.timeout_secs,
        )?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Embedder for OpenAiProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.client.embeddings(texts).await
    }
}

#[async_trait]
impl Completer for OpenAiProvider {
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
