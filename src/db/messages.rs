//! Append-only chat history for replay to joining clients.

use super::DbError;
use sqlx::SqlitePool;

/// One persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub sender: String,
    pub body: String,
    pub timestamp: String,
}

impl StoredMessage {
    /// Render the message the way it is delivered to clients.
    pub fn to_line(&self) -> String {
        format!("[{}] {}: {}", self.timestamp, self.sender, self.body)
    }
}

/// Repository for message history.
pub struct MessageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MessageRepository<'a> {
    /// Create a new message repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message with a server-assigned timestamp.
    pub async fn append(&self, sender: &str, body: &str) -> Result<StoredMessage, DbError> {
        let timestamp = crate::util::clock_time();
        let created_at = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO messages (sender, body, timestamp, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(sender)
        .bind(body)
        .bind(&timestamp)
        .bind(created_at)
        .execute(self.pool)
        .await?;

        Ok(StoredMessage {
            sender: sender.to_string(),
            body: body.to_string(),
            timestamp,
        })
    }

    /// Fetch up to `limit` most recent messages, oldest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<StoredMessage>, DbError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT sender, body, timestamp
            FROM messages
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        let mut messages: Vec<StoredMessage> = rows
            .into_iter()
            .map(|(sender, body, timestamp)| StoredMessage {
                sender,
                body,
                timestamp,
            })
            .collect();

        // Query returns newest first; replay wants chronological order.
        messages.reverse();
        Ok(messages)
    }
}
