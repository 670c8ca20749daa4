//! Chat sessions grounded in retrieved documents.

mod store;

pub use store::{MemorySessionStore, SessionStore, SessionSummary, SqliteSessionStore};

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ChatError, StorageError};
use crate::models::{ChatConfig, ChatMessage, ChatSession, Role, ScoredChunk, TokenStats};
use crate::providers::Completer;
use crate::search::SearchOrchestrator;
use crate::utils::strip_think_tags;

const GROUNDED_PROMPT_HEADER: &str = "\
You are a helpful assistant that answers questions strictly based on the \
provided documents.

When answering:
- Use only the provided document text. Do not invent or guess.
- Use full sentences and clearly explained reasoning.
- Annotate factual statements with footnote references like [1], [2] that \
point at the numbered documents below.
- Maintain conversation context from previous messages.
- Format the answer in valid Markdown with footnotes at the end.

If the documents do not answer the question, respond with: I don't know.

Documents:
";

const SUMMARIZE_PROMPT: &str = "\
Summarize the following conversation. Preserve every concrete fact, decision, \
and open question so the conversation can continue from the summary alone. \
Respond with the summary text only.";

/// A streaming assistant reply.
///
/// `tokens` yields reply fragments in order. The assistant message is
/// committed to the session only after the stream finishes cleanly; dropping
/// `tokens` early cancels generation and commits nothing. `handle` resolves
/// to the commit outcome.
pub struct ReplyStream {
    pub tokens: mpsc::Receiver<Result<String, ChatError>>,
    pub handle: JoinHandle<Result<(), ChatError>>,
}

/// Manages chat sessions: history, grounded replies, and compaction.
pub struct ChatSessionManager {
    config: ChatConfig,
    store: Arc<dyn SessionStore>,
    completer: Arc<dyn Completer>,
    orchestrator: Arc<SearchOrchestrator>,
}

impl ChatSessionManager {
    pub fn new(
        config: ChatConfig,
        store: Arc<dyn SessionStore>,
        completer: Arc<dyn Completer>,
        orchestrator: Arc<SearchOrchestrator>,
    ) -> Self {
        Self {
            config,
            store,
            completer,
            orchestrator,
        }
    }

    pub async fn create_session(&self) -> Result<String, ChatError> {
        Ok(self.store.create().await?)
    }

    pub async fn append_user(&self, session_id: &str, text: &str) -> Result<(), ChatError> {
        self.store
            .append_message(session_id, ChatMessage::user(text))
            .await
            .map_err(|e| Self::map_not_found(e, session_id))
    }

    pub async fn get_history(&self, session_id: &str) -> Result<ChatSession, ChatError> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    /// Token statistics, always recomputed from the full stored history.
    pub async fn get_token_stats(&self, session_id: &str) -> Result<TokenStats, ChatError> {
        Ok(self.get_history(session_id).await?.token_stats())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ChatError> {
        Ok(self.store.list().await?)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), ChatError> {
        self.store
            .delete(session_id)
            .await
            .map_err(|e| Self::map_not_found(e, session_id))
    }

    /// Generate a streamed assistant reply to the latest user message.
    ///
    /// Retrieval runs through the search orchestrator, the retrieved chunks
    /// become the numbered context of the system prompt, and the completion
    /// streams back to the caller token by token.
    pub async fn generate_reply(&self, session_id: &str) -> Result<ReplyStream, ChatError> {
        let session = self.get_history(session_id).await?;
        let user_message = session
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or(ChatError::NoUserMessage)?
            .content
            .clone();

        let (tx, rx) = mpsc::channel(self.config.stream_buffer);
        let store = Arc::clone(&self.store);
        let completer = Arc::clone(&self.completer);
        let orchestrator = Arc::clone(&self.orchestrator);
        let context_top_k = self.config.context_top_k;
        let session_id = session_id.to_string();
        let history = session.messages;

        let handle = tokio::spawn(async move {
            let outcome = match orchestrator.search(&user_message).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let _ = tx.send(Err(ChatError::Search(e))).await;
                    return Err(ChatError::Cancelled);
                }
            };

            tracing::debug!(
                session = %session_id,
                chunks = outcome.best_chunks.len(),
                score = outcome.best_score,
                "retrieved reply context"
            );

            let system = build_system_prompt(&outcome.best_chunks, context_top_k);
            let mut messages = Vec::with_capacity(history.len() + 1);
            messages.push(ChatMessage::system(system));
            messages.extend(history);

            let mut stream = match completer.complete_stream(&messages).await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = tx.send(Err(ChatError::Provider(e))).await;
                    return Err(ChatError::Cancelled);
                }
            };

            let mut reply = String::new();
            while let Some(item) = stream.recv().await {
                match item {
                    Ok(token) => {
                        reply.push_str(&token);
                        if tx.send(Ok(token)).await.is_err() {
                            // Consumer disconnected: drop the provider stream
                            // and leave the session unchanged.
                            tracing::debug!(session = %session_id, "reply stream cancelled");
                            return Err(ChatError::Cancelled);
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ChatError::Provider(e))).await;
                        return Err(ChatError::Cancelled);
                    }
                }
            }

            let result = store
                .append_message(&session_id, ChatMessage::assistant(&reply))
                .await;
            if let Err(e) = result {
                let error = ChatError::Storage(e);
                let _ = tx.send(Err(error)).await;
                return Err(ChatError::Cancelled);
            }

            tracing::debug!(
                session = %session_id,
                reply_chars = reply.chars().count(),
                "assistant reply committed"
            );
            Ok(())
        });

        Ok(ReplyStream { tokens: rx, handle })
    }

    /// Replace the full history with a single assistant summary message.
    pub async fn summarize_and_compact(&self, session_id: &str) -> Result<TokenStats, ChatError> {
        let session = self.get_history(session_id).await?;
        if session.messages.is_empty() {
            return Err(ChatError::NoUserMessage);
        }

        let transcript = session
            .messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let messages = [
            ChatMessage::system(SUMMARIZE_PROMPT),
            ChatMessage::user(transcript),
        ];
        let raw = self.completer.complete(&messages).await?;
        let summary = strip_think_tags(&raw);

        let message = ChatMessage::assistant(summary);
        let stats = TokenStats::from_messages(std::slice::from_ref(&message));
        self.store
            .replace_with_summary(session_id, message)
            .await
            .map_err(|e| Self::map_not_found(e, session_id))?;

        tracing::info!(
            session = %session_id,
            messages_before = session.messages.len(),
            tokens_after = stats.total_tokens,
            "session compacted"
        );
        Ok(stats)
    }

    fn map_not_found(error: StorageError, session_id: &str) -> ChatError {
        match error {
            StorageError::NotFound(_) => ChatError::SessionNotFound(session_id.to_string()),
            other => ChatError::Storage(other),
        }
    }
}

fn build_system_prompt(chunks: &[ScoredChunk], top_k: usize) -> String {
    let mut prompt = GROUNDED_PROMPT_HEADER.to_string();

    if chunks.is_empty() {
        prompt.push_str("(no documents retrieved)\n");
        return prompt;
    }

    for (i, chunk) in chunks.iter().take(top_k).enumerate() {
        prompt.push_str(&format!(
            "{}. \"{}\"\nsource: {} (chunk {})\n\n",
            i + 1,
            chunk.content,
            chunk.source,
            chunk.chunk_index
        ));
    }
    prompt
}
