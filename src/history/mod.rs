//! Chat, message, and document persistence on SQLite.
//!
//! The core treats this as a pass-through record store. Message rows carry
//! the extracted evidence (JSON) and confidence alongside the text; document
//! rows may hold a placeholder marker instead of extracted content.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use crate::core::errors::ApiError;
use crate::stream::{Confidence, EvidenceItem};
use crate::util::truncate_chars;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: String,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub chat_id: String,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    pub confidence: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct ChatStore {
    pool: SqlitePool,
}

impl ChatStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let conn_str = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        Self::connect(&conn_str, 5).await
    }

    /// In-memory store, used by tests. A single connection: every pooled
    /// connection to `:memory:` would otherwise open its own empty database.
    pub async fn in_memory() -> Result<Self, ApiError> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(conn_str: &str, max_connections: u32) -> Result<Self, ApiError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(conn_str)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to chat db: {}", e)))?;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to enable foreign keys: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                title TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init chats table: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                evidence JSON,
                confidence TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(chat_id) REFERENCES chats(id) ON DELETE CASCADE
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init messages table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id)")
            .execute(&pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create index: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init documents table: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn create_chat(&self, title: Option<String>) -> Result<ChatInfo, ApiError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO chats (id, title, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&title)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create chat: {}", e)))?;

        Ok(ChatInfo {
            id,
            title,
            created_at: now.clone(),
            updated_at: now,
            message_count: 0,
        })
    }

    pub async fn list_chats(&self) -> Result<Vec<ChatInfo>, ApiError> {
        let rows = sqlx::query(
            "SELECT c.id, c.title, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.chat_id = c.id) AS message_count
             FROM chats c ORDER BY c.updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .into_iter()
            .map(|row| ChatInfo {
                id: row.get("id"),
                title: row.get("title"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
                message_count: row.get("message_count"),
            })
            .collect())
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<Option<ChatInfo>, ApiError> {
        let row = sqlx::query(
            "SELECT c.id, c.title, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.chat_id = c.id) AS message_count
             FROM chats c WHERE c.id = ?",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(row.map(|row| ChatInfo {
            id: row.get("id"),
            title: row.get("title"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            message_count: row.get("message_count"),
        }))
    }

    pub async fn delete_chat(&self, chat_id: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    /// Titles an untitled chat after its first user message: a 30-character
    /// prefix with a trailing ellipsis when cut.
    pub async fn maybe_autotitle(&self, chat_id: &str, content: &str) -> Result<(), ApiError> {
        let Some(chat) = self.get_chat(chat_id).await? else {
            return Ok(());
        };
        let untitled = matches!(chat.title.as_deref(), None | Some("New Chat"));
        if !untitled || chat.message_count > 0 {
            return Ok(());
        }

        let prefix = truncate_chars(content, 30);
        let title = if prefix.len() < content.len() {
            format!("{}...", prefix)
        } else {
            prefix.to_string()
        };

        sqlx::query("UPDATE chats SET title = ?, updated_at = ? WHERE id = ?")
            .bind(&title)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    pub async fn append_message(
        &self,
        chat_id: &str,
        role: &str,
        content: &str,
        evidence: &[EvidenceItem],
        confidence: Option<Confidence>,
    ) -> Result<i64, ApiError> {
        let evidence_json = if evidence.is_empty() {
            None
        } else {
            Some(serde_json::to_string(evidence).map_err(ApiError::internal)?)
        };

        // One transaction: the message row and the chat's updated_at bump
        // land together or not at all.
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        let result = sqlx::query(
            "INSERT INTO messages (chat_id, role, content, evidence, confidence, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(chat_id)
        .bind(role)
        .bind(content)
        .bind(evidence_json)
        .bind(confidence.map(|c| c.as_str()))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to append message: {}", e)))?;

        sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(chat_id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_messages(
        &self,
        chat_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, chat_id, role, content, evidence, confidence, created_at
             FROM messages WHERE chat_id = ? ORDER BY id ASC LIMIT ?",
        )
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let evidence: Vec<EvidenceItem> = row
                    .get::<Option<String>, _>("evidence")
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or_default();
                StoredMessage {
                    id: row.get("id"),
                    chat_id: row.get("chat_id"),
                    role: row.get("role"),
                    content: row.get("content"),
                    evidence,
                    confidence: row.get("confidence"),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }

    pub async fn create_document(
        &self,
        name: &str,
        content: &str,
    ) -> Result<DocumentRecord, ApiError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO documents (id, name, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(content)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create document: {}", e)))?;

        Ok(DocumentRecord {
            id,
            name: name.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, name, content, created_at FROM documents ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .into_iter()
            .map(|row| DocumentRecord {
                id: row.get("id"),
                name: row.get("name"),
                content: row.get("content"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn message_with_evidence_round_trips() {
        let store = ChatStore::in_memory().await.unwrap();
        let chat = store.create_chat(None).await.unwrap();

        let evidence = vec![EvidenceItem {
            document: Some("notes.txt".to_string()),
            page: Some("2".to_string()),
            text: Some("quoted line".to_string()),
        }];
        store
            .append_message(&chat.id, "assistant", "answer", &evidence, Some(Confidence::High))
            .await
            .unwrap();

        let messages = store.get_messages(&chat.id, 100).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "assistant");
        assert_eq!(messages[0].evidence, evidence);
        assert_eq!(messages[0].confidence.as_deref(), Some("High"));
    }

    #[tokio::test]
    async fn messages_keep_insertion_order() {
        let store = ChatStore::in_memory().await.unwrap();
        let chat = store.create_chat(Some("t".to_string())).await.unwrap();

        for content in ["one", "two", "three"] {
            store
                .append_message(&chat.id, "user", content, &[], None)
                .await
                .unwrap();
        }

        let contents: Vec<String> = store
            .get_messages(&chat.id, 100)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn autotitle_uses_thirty_char_prefix() {
        let store = ChatStore::in_memory().await.unwrap();
        let chat = store.create_chat(None).await.unwrap();

        let long = "this user message is definitely longer than thirty characters";
        store.maybe_autotitle(&chat.id, long).await.unwrap();

        let chat = store.get_chat(&chat.id).await.unwrap().unwrap();
        let title = chat.title.unwrap();
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 33);
    }

    #[tokio::test]
    async fn autotitle_skips_titled_or_active_chats() {
        let store = ChatStore::in_memory().await.unwrap();
        let chat = store.create_chat(Some("Budget talk".to_string())).await.unwrap();

        store.maybe_autotitle(&chat.id, "ignored").await.unwrap();
        let reloaded = store.get_chat(&chat.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title.as_deref(), Some("Budget talk"));
    }

    #[tokio::test]
    async fn append_message_bumps_chat_updated_at() {
        let store = ChatStore::in_memory().await.unwrap();
        let chat = store.create_chat(None).await.unwrap();

        store
            .append_message(&chat.id, "user", "hello", &[], None)
            .await
            .unwrap();

        let reloaded = store.get_chat(&chat.id).await.unwrap().unwrap();
        assert!(reloaded.updated_at >= chat.updated_at);
        assert_ne!(reloaded.updated_at, chat.created_at);
    }

    #[tokio::test]
    async fn append_to_missing_chat_fails_and_writes_nothing() {
        let store = ChatStore::in_memory().await.unwrap();

        let result = store
            .append_message("no-such-chat", "user", "orphan", &[], None)
            .await;
        assert!(result.is_err());
        assert!(store.get_messages("no-such-chat", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_chat_cascades_to_messages() {
        let store = ChatStore::in_memory().await.unwrap();
        let chat = store.create_chat(None).await.unwrap();
        store
            .append_message(&chat.id, "user", "hello", &[], None)
            .await
            .unwrap();

        store.delete_chat(&chat.id).await.unwrap();
        assert!(store.get_chat(&chat.id).await.unwrap().is_none());
        assert!(store.get_messages(&chat.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn documents_round_trip() {
        let store = ChatStore::in_memory().await.unwrap();
        let doc = store
            .create_document("report.pdf", "[PDF Document: report.pdf]")
            .await
            .unwrap();

        let listed = store.list_documents().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "report.pdf");

        store.delete_document(&doc.id).await.unwrap();
        assert!(store.list_documents().await.unwrap().is_empty());
    }
}
