use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Marker that the "lesson starts soon" reminder went out.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LessonReminder {
    pub lesson_id: i64,
    pub sent_at: String,
}

impl LessonReminder {
    /// Idempotent: a second call for the same lesson keeps the first row.
    pub async fn create(
        pool: &sqlx::SqlitePool,
        lesson_id: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO lesson_reminders (lesson_id) VALUES (?)")
            .bind(lesson_id)
            .execute(pool)
            .await?;

        sqlx::query_as::<_, LessonReminder>(
            "SELECT lesson_id, sent_at FROM lesson_reminders WHERE lesson_id = ?"
        )
        .bind(lesson_id)
        .fetch_one(pool)
        .await
    }

    pub async fn exists(
        pool: &sqlx::SqlitePool,
        lesson_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM lesson_reminders WHERE lesson_id = ?"
        )
        .bind(lesson_id)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }
}
