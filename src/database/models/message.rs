use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A stored direct message between two users.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub sent_at: String,
    pub is_read: bool,
}

impl DirectMessage {
    pub async fn create(
        pool: &SqlitePool,
        sender_id: i64,
        recipient_id: i64,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO messages (sender_id, recipient_id, content)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(sender_id)
        .bind(recipient_id)
        .bind(content)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &SqlitePool, message_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DirectMessage>(
            "SELECT id, sender_id, recipient_id, content, sent_at, is_read FROM messages WHERE id = ?",
        )
        .bind(message_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn unread_for(pool: &SqlitePool, recipient_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DirectMessage>(
            r#"
            SELECT id, sender_id, recipient_id, content, sent_at, is_read FROM messages
            WHERE recipient_id = ? AND is_read = 0
            ORDER BY sent_at, id
            "#,
        )
        .bind(recipient_id)
        .fetch_all(pool)
        .await
    }

    /// Messages between two users in either direction, oldest first.
    pub async fn conversation(pool: &SqlitePool, a: i64, b: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DirectMessage>(
            r#"
            SELECT id, sender_id, recipient_id, content, sent_at, is_read FROM messages
            WHERE (sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?)
            ORDER BY sent_at, id
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(pool)
        .await
    }

    pub async fn mark_read(pool: &SqlitePool, message_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE messages SET is_read = 1 WHERE id = ?")
            .bind(message_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(pool)
            .await
    }
}
