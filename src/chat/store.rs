//! Chat session persistence.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::models::{ChatMessage, ChatSession, Role};

/// Listing entry: session metadata without the message bodies.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: u64,
}

/// Persistence seam for chat sessions.
///
/// `append_message` and `replace_with_summary` are atomic per session; a
/// failed write leaves the stored history untouched.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new empty session and return its ID.
    async fn create(&self) -> Result<String, StorageError>;

    /// Fetch a session with its full ordered history.
    async fn get(&self, session_id: &str) -> Result<Option<ChatSession>, StorageError>;

    /// List sessions, most recently updated first.
    async fn list(&self) -> Result<Vec<SessionSummary>, StorageError>;

    /// Append one message to an existing session.
    async fn append_message(
        &self,
        session_id: &str,
        message: ChatMessage,
    ) -> Result<(), StorageError>;

    /// Atomically replace the entire history with a single summary message.
    async fn replace_with_summary(
        &self,
        session_id: &str,
        summary: ChatMessage,
    ) -> Result<(), StorageError>;

    /// Delete the session and all its messages.
    async fn delete(&self, session_id: &str) -> Result<(), StorageError>;
}

fn session_err(e: sqlx::Error) -> StorageError {
    StorageError::SessionError(e.to_string())
}

/// SQLite-backed session store.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub async fn new(db_path: &Path) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(session_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(session_id) REFERENCES sessions(id) ON DELETE CASCADE
            )",
        )
        .execute(&pool)
        .await
        .map_err(session_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_session_id ON messages(session_id)")
            .execute(&pool)
            .await
            .map_err(session_err)?;

        Ok(Self { pool })
    }

    async fn session_exists(
        executor: &mut sqlx::SqliteConnection,
        session_id: &str,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(executor)
            .await
            .map_err(session_err)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self) -> Result<String, StorageError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO sessions (id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(&session_id)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(session_err)?;

        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<ChatSession>, StorageError> {
        let Some(row) = sqlx::query("SELECT created_at, updated_at FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(session_err)?
        else {
            return Ok(None);
        };

        let created_at: String = row.try_get("created_at").map_err(session_err)?;
        let updated_at: String = row.try_get("updated_at").map_err(session_err)?;

        let rows = sqlx::query(
            "SELECT role, content, created_at FROM messages WHERE session_id = ? ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(session_err)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let role_str: String = row.try_get("role").map_err(session_err)?;
            let role: Role = role_str
                .parse()
                .map_err(|e: String| StorageError::SessionError(e))?;
            messages.push(ChatMessage {
                role,
                content: row.try_get("content").map_err(session_err)?,
                created_at: row.try_get("created_at").map_err(session_err)?,
            });
        }

        Ok(Some(ChatSession {
            id: session_id.to_string(),
            messages,
            created_at,
            updated_at,
        }))
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StorageError> {
        let rows = sqlx::query(
            "SELECT s.id, s.created_at, s.updated_at, COUNT(m.id) as msg_count \
             FROM sessions s \
             LEFT JOIN messages m ON s.id = m.session_id \
             GROUP BY s.id \
             ORDER BY s.updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(session_err)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            summaries.push(SessionSummary {
                id: row.try_get("id").map_err(session_err)?,
                created_at: row.try_get("created_at").map_err(session_err)?,
                updated_at: row.try_get("updated_at").map_err(session_err)?,
                message_count: row.try_get::<i64, _>("msg_count").map_err(session_err)? as u64,
            });
        }
        Ok(summaries)
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: ChatMessage,
    ) -> Result<(), StorageError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(session_err)?;

        if !Self::session_exists(&mut *tx, session_id).await? {
            return Err(StorageError::NotFound(session_id.to_string()));
        }

        sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(session_err)?;

        sqlx::query(
            "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(&message.created_at)
        .execute(&mut *tx)
        .await
        .map_err(session_err)?;

        tx.commit().await.map_err(session_err)?;
        Ok(())
    }

    async fn replace_with_summary(
        &self,
        session_id: &str,
        summary: ChatMessage,
    ) -> Result<(), StorageError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(session_err)?;

        if !Self::session_exists(&mut *tx, session_id).await? {
            return Err(StorageError::NotFound(session_id.to_string()));
        }

        sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(session_err)?;

        sqlx::query(
            "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(summary.role.to_string())
        .bind(&summary.content)
        .bind(&summary.created_at)
        .execute(&mut *tx)
        .await
        .map_err(session_err)?;

        sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(session_err)?;

        tx.commit().await.map_err(session_err)?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(session_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(session_id.to_string()));
        }
        Ok(())
    }
}

/// In-memory session store for tests and ephemeral use.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self) -> Result<String, StorageError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let session = ChatSession {
            id: session_id.clone(),
            messages: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), session);
        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<ChatSession>, StorageError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StorageError> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .map(|s| SessionSummary {
                id: s.id.clone(),
                created_at: s.created_at.clone(),
                updated_at: s.updated_at.clone(),
                message_count: s.messages.len() as u64,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: ChatMessage,
    ) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StorageError::NotFound(session_id.to_string()))?;
        session.messages.push(message);
        session.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(())
    }

    async fn replace_with_summary(
        &self,
        session_id: &str,
        summary: ChatMessage,
    ) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StorageError::NotFound(session_id.to_string()))?;
        session.messages = vec![summary];
        session.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StorageError> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sqlite_store() -> (tempfile::TempDir, SqliteSessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSessionStore::new(&dir.path().join("sessions.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let (_dir, store) = sqlite_store().await;

        let id = store.create().await.unwrap();
        store
            .append_message(&id, ChatMessage::user("hello"))
            .await
            .unwrap();
        store
            .append_message(&id, ChatMessage::assistant("hi there"))
            .await
            .unwrap();

        let session = store.get(&id).await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].content, "hello");
        assert_eq!(session.messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_sqlite_append_missing_session() {
        let (_dir, store) = sqlite_store().await;
        let result = store
            .append_message("nope", ChatMessage::user("hello"))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sqlite_replace_with_summary() {
        let (_dir, store) = sqlite_store().await;

        let id = store.create().await.unwrap();
        for i in 0..6 {
            store
                .append_message(&id, ChatMessage::user(format!("message {i}")))
                .await
                .unwrap();
        }

        store
            .replace_with_summary(&id, ChatMessage::assistant("summary of six messages"))
            .await
            .unwrap();

        let session = store.get(&id).await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, Role::Assistant);
        assert_eq!(session.messages[0].content, "summary of six messages");
    }

    #[tokio::test]
    async fn test_sqlite_delete_cascades() {
        let (_dir, store) = sqlite_store().await;

        let id = store.create().await.unwrap();
        store
            .append_message(&id, ChatMessage::user("hello"))
            .await
            .unwrap();

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(matches!(
            store.delete(&id).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sqlite_list_orders_by_update() {
        let (_dir, store) = sqlite_store().await;

        let first = store.create().await.unwrap();
        let second = store.create().await.unwrap();
        store
            .append_message(&first, ChatMessage::user("bump"))
            .await
            .unwrap();

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 2);
        let bumped = summaries.iter().find(|s| s.id == first).unwrap();
        assert_eq!(bumped.message_count, 1);
        let other = summaries.iter().find(|s| s.id == second).unwrap();
        assert_eq!(other.message_count, 0);
    }

    #[tokio::test]
    async fn test_memory_store_basics() {
        let store = MemorySessionStore::new();

        let id = store.create().await.unwrap();
        store
            .append_message(&id, ChatMessage::user("hello"))
            .await
            .unwrap();

        let session = store.get(&id).await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 1);

        store
            .replace_with_summary(&id, ChatMessage::assistant("summary"))
            .await
            .unwrap();
        assert_eq!(store.get(&id).await.unwrap().unwrap().messages.len(), 1);

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
    }
}
