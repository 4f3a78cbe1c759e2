use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use std::fmt;

const LESSON_COLUMNS: &str =
    "id, student_id, tutor_id, lesson_date, lesson_time, subject, status, cost, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Scheduled => "scheduled",
            LessonStatus::Completed => "completed",
            LessonStatus::Cancelled => "cancelled",
            LessonStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LessonStatus::Scheduled => "📅",
            LessonStatus::Completed => "✅",
            LessonStatus::Cancelled => "❌",
            LessonStatus::Rescheduled => "🔁",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(LessonStatus::Scheduled),
            "completed" => Some(LessonStatus::Completed),
            "cancelled" => Some(LessonStatus::Cancelled),
            "rescheduled" => Some(LessonStatus::Rescheduled),
            _ => None,
        }
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub student_id: i64,
    pub tutor_id: i64,
    /// `YYYY-MM-DD`
    pub lesson_date: String,
    /// `HH:MM`
    pub lesson_time: String,
    pub subject: Option<String>,
    pub status: String,
    pub cost: i64,
    pub created_at: String,
}

impl Lesson {
    pub fn status(&self) -> LessonStatus {
        LessonStatus::parse(&self.status).unwrap_or(LessonStatus::Scheduled)
    }

    /// Whether the lesson can still be completed, cancelled or moved.
    pub fn is_open(&self) -> bool {
        matches!(self.status(), LessonStatus::Scheduled | LessonStatus::Rescheduled)
    }

    pub async fn create(
        pool: &SqlitePool,
        student_id: i64,
        tutor_id: i64,
        lesson_date: &str,
        lesson_time: &str,
        subject: Option<&str>,
        cost: i64,
    ) -> Result<Self, sqlx::Error> {
        let id = Self::insert(pool, student_id, tutor_id, lesson_date, lesson_time, subject, cost).await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Inserts a scheduled lesson and returns its id.
    pub(crate) async fn insert<'e, E>(
        executor: E,
        student_id: i64,
        tutor_id: i64,
        lesson_date: &str,
        lesson_time: &str,
        subject: Option<&str>,
        cost: i64,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO lessons (student_id, tutor_id, lesson_date, lesson_time, subject, status, cost)
            VALUES (?, ?, ?, ?, ?, 'scheduled', ?)
            "#,
        )
        .bind(student_id)
        .bind(tutor_id)
        .bind(lesson_date)
        .bind(lesson_time)
        .bind(subject)
        .bind(cost)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(pool: &SqlitePool, lesson_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?"))
            .bind(lesson_id)
            .fetch_optional(pool)
            .await
    }

    /// Non-cancelled lessons on or after `today`, earliest first.
    pub async fn upcoming_for_student(
        pool: &SqlitePool,
        student_id: i64,
        today: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            r#"
            SELECT {LESSON_COLUMNS} FROM lessons
            WHERE student_id = ? AND lesson_date >= ? AND status != 'cancelled'
            ORDER BY lesson_date, lesson_time
            "#
        ))
        .bind(student_id)
        .bind(today)
        .fetch_all(pool)
        .await
    }

    pub async fn upcoming_for_tutor(
        pool: &SqlitePool,
        tutor_id: i64,
        today: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            r#"
            SELECT {LESSON_COLUMNS} FROM lessons
            WHERE tutor_id = ? AND lesson_date >= ? AND status != 'cancelled'
            ORDER BY lesson_date, lesson_time
            "#
        ))
        .bind(tutor_id)
        .bind(today)
        .fetch_all(pool)
        .await
    }

    /// Flip the status of an open lesson. Returns false when the lesson is
    /// missing or already completed/cancelled.
    pub async fn set_status(
        pool: &SqlitePool,
        lesson_id: i64,
        status: LessonStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lessons SET status = ? WHERE id = ? AND status IN ('scheduled', 'rescheduled')",
        )
        .bind(status.as_str())
        .bind(lesson_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn reschedule(
        pool: &SqlitePool,
        lesson_id: i64,
        lesson_date: &str,
        lesson_time: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE lessons SET lesson_date = ?, lesson_time = ?, status = 'rescheduled'
            WHERE id = ? AND status IN ('scheduled', 'rescheduled')
            "#,
        )
        .bind(lesson_date)
        .bind(lesson_time)
        .bind(lesson_id)
        .execute(&mut tx)
        .await?;

        // A moved lesson gets a fresh reminder.
        sqlx::query("DELETE FROM lesson_reminders WHERE lesson_id = ?")
            .bind(lesson_id)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Open lessons starting in `(after, until]` that have not been reminded.
    /// Both bounds are `YYYY-MM-DD HH:MM` in the lessons' local time.
    pub async fn due_for_reminder(
        pool: &SqlitePool,
        after: &str,
        until: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            r#"
            SELECT {LESSON_COLUMNS} FROM lessons
            WHERE status IN ('scheduled', 'rescheduled')
              AND lesson_date || ' ' || lesson_time > ?
              AND lesson_date || ' ' || lesson_time <= ?
              AND id NOT IN (SELECT lesson_id FROM lesson_reminders)
            ORDER BY lesson_date, lesson_time
            "#
        ))
        .bind(after)
        .bind(until)
        .fetch_all(pool)
        .await
    }
}
