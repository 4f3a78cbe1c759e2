use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A time a tutor has marked as free for booking.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub id: i64,
    pub tutor_id: i64,
    pub slot_date: String,
    pub slot_time: String,
    pub is_booked: bool,
    pub created_at: String,
}

impl AvailableSlot {
    pub async fn create(
        pool: &SqlitePool,
        tutor_id: i64,
        slot_date: &str,
        slot_time: &str,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO available_slots (tutor_id, slot_date, slot_time)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(tutor_id)
        .bind(slot_date)
        .bind(slot_time)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &SqlitePool, slot_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AvailableSlot>(
            "SELECT id, tutor_id, slot_date, slot_time, is_booked, created_at FROM available_slots WHERE id = ?",
        )
        .bind(slot_id)
        .fetch_optional(pool)
        .await
    }

    /// Unbooked slots from `today` on.
    pub async fn open_for_tutor(
        pool: &SqlitePool,
        tutor_id: i64,
        today: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AvailableSlot>(
            r#"
            SELECT id, tutor_id, slot_date, slot_time, is_booked, created_at
            FROM available_slots
            WHERE tutor_id = ? AND is_booked = 0 AND slot_date >= ?
            ORDER BY slot_date, slot_time
            "#,
        )
        .bind(tutor_id)
        .bind(today)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, slot_id: i64, tutor_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM available_slots WHERE id = ? AND tutor_id = ?")
            .bind(slot_id)
            .bind(tutor_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a free slot as taken once a lesson was created for it.
    pub async fn book(pool: &SqlitePool, slot_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE available_slots SET is_booked = 1 WHERE id = ? AND is_booked = 0")
            .bind(slot_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
