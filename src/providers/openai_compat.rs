//! Shared HTTP client for the OpenAI-compatible REST surface.
//!
//! All supported backends (Ollama, OpenAI, Gemini) expose the same
//! `/chat/completions` and `/embeddings` endpoints; only base URL and
//! authentication differ.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::error::ProviderError;
use crate::models::ChatMessage;

use super::CompletionStream;

/// Channel capacity for streamed completion chunks.
const STREAM_BUFFER: usize = 32;

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

/// OpenAI-compatible chat/embedding client.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    timeout: Duration,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        chat_model: &str,
        embedding_model: &str,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: chat_model.to_string(),
            embedding_model: embedding_model.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, url: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url).json(body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    fn wire_messages<'a>(messages: &'a [ChatMessage]) -> Vec<WireMessage<'a>> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    crate::models::Role::System => "system",
                    crate::models::Role::User => "user",
                    crate::models::Role::Assistant => "assistant",
                },
                content: &m.content,
            })
            .collect()
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthError(format!("status {status}: {body}")));
        }
        Err(ProviderError::ServerError(format!(
            "status {status}: {body}"
        )))
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.chat_model,
            "messages": Self::wire_messages(messages),
            "stream": false,
        });

        let response = timeout(self.timeout, self.request(&url, &body).send())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(ProviderError::RequestError)?;
        let response = Self::check_status(response).await?;

        let payload: ChatResponse = timeout(self.timeout, response.json())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no completion choices".to_string()))
    }

    /// Streaming chat completion over SSE.
    ///
    /// Delta content is forwarded over a bounded channel; when the receiver
    /// is dropped the forwarding task returns, which drops the response body
    /// and aborts the upstream request.
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<CompletionStream, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.chat_model,
            "messages": Self::wire_messages(messages),
            "stream": true,
        });

        let response = timeout(self.timeout, self.request(&url, &body).send())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(ProviderError::RequestError)?;
        let response = Self::check_status(response).await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut buffer = String::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        // SSE events are newline-delimited; keep any partial line
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim().to_string();
                            buffer.drain(..=pos);
                            if line.is_empty() {
                                continue;
                            }
                            if line == "data: [DONE]" {
                                return;
                            }
                            let Some(data) = line.strip_prefix("data: ") else {
                                continue;
                            };
                            let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else {
                                continue;
                            };
                            if let Some(content) =
                                value["choices"][0]["delta"]["content"].as_str()
                                && !content.is_empty()
                                && tx.send(Ok(content.to_string())).await.is_err()
                            {
                                // Receiver gone: stop reading the upstream body
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::RequestError(e))).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    /// Batch embeddings.
    pub async fn embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.embedding_model,
            "input": texts,
        });

        let response = timeout(self.timeout, self.request(&url, &body).send())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(ProviderError::RequestError)?;
        let response = Self::check_status(response).await?;

        let payload: EmbeddingsResponse = timeout(self.timeout, response.json())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if payload.data.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                payload.data.len()
            )));
        }

        Ok(payload.data.into_iter().map(|d| d.embedding).collect())
    }
}
