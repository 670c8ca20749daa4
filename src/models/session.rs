//! Chat session models and token accounting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A persisted multi-turn conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: String,
    pub updated_at: String,
}

impl ChatSession {
    /// Token statistics recomputed from the full history.
    pub fn token_stats(&self) -> TokenStats {
        TokenStats::from_messages(&self.messages)
    }
}

/// Deterministic token counters for a session.
///
/// Always recomputed from message text with the fixed `estimate_tokens` rule,
/// never adjusted incrementally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStats {
    pub total_tokens: u64,
    pub user_tokens: u64,
    pub assistant_tokens: u64,
    pub message_count: u64,
}

impl TokenStats {
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        let mut stats = TokenStats::default();
        for message in messages {
            let tokens = estimate_tokens(&message.content);
            stats.total_tokens += tokens;
            match message.role {
                Role::User => stats.user_tokens += tokens,
                Role::Assistant => stats.assistant_tokens += tokens,
                Role::System => {}
            }
            stats.message_count += 1;
        }
        stats
    }
}

/// Estimate the number of tokens in a text.
/// Uses a simple heuristic: ~4 characters per token on average.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}
