use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VacationPeriod {
    pub id: i64,
    pub tutor_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub reason: Option<String>,
    pub created_at: String,
}

impl VacationPeriod {
    /// Inclusive on both ends. Dates are `YYYY-MM-DD`, so text order is date order.
    pub fn contains(&self, date: &str) -> bool {
        self.start_date.as_str() <= date && date <= self.end_date.as_str()
    }

    pub async fn create(
        pool: &SqlitePool,
        tutor_id: i64,
        start_date: &str,
        end_date: &str,
        reason: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO vacation_periods (tutor_id, start_date, end_date, reason)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(tutor_id)
        .bind(start_date)
        .bind(end_date)
        .bind(reason)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &SqlitePool, vacation_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, VacationPeriod>(
            "SELECT id, tutor_id, start_date, end_date, reason, created_at FROM vacation_periods WHERE id = ?",
        )
        .bind(vacation_id)
        .fetch_optional(pool)
        .await
    }

    /// Vacations that have not ended before `today`.
    pub async fn for_tutor(
        pool: &SqlitePool,
        tutor_id: i64,
        today: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, VacationPeriod>(
            r#"
            SELECT id, tutor_id, start_date, end_date, reason, created_at
            FROM vacation_periods
            WHERE tutor_id = ? AND end_date >= ?
            ORDER BY start_date
            "#,
        )
        .bind(tutor_id)
        .bind(today)
        .fetch_all(pool)
        .await
    }

    pub async fn covers(pool: &SqlitePool, tutor_id: i64, date: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM vacation_periods WHERE tutor_id = ? AND start_date <= ? AND end_date >= ?",
        )
        .bind(tutor_id)
        .bind(date)
        .bind(date)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }
}
