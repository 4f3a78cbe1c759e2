use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentRequest {
    pub id: i64,
    pub student_id: i64,
    pub tutor_id: i64,
    pub status: String,
    pub created_at: String,
}

/// A pending request joined with the student's profile for display.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: i64,
    pub student_id: i64,
    pub student_name: Option<String>,
    pub username: Option<String>,
    pub age: Option<i64>,
    pub timezone: Option<String>,
    pub subject: Option<String>,
    pub created_at: String,
}

impl StudentRequest {
    pub fn status(&self) -> RequestStatus {
        RequestStatus::parse(&self.status).unwrap_or(RequestStatus::Pending)
    }

    pub async fn create(conn: &mut SqliteConnection, student_id: i64, tutor_id: i64) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO student_requests (student_id, tutor_id, status)
            VALUES (?, ?, 'pending')
            "#,
        )
        .bind(student_id)
        .bind(tutor_id)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        sqlx::query_as::<_, StudentRequest>(
            "SELECT id, student_id, tutor_id, status, created_at FROM student_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &SqlitePool, request_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, StudentRequest>(
            "SELECT id, student_id, tutor_id, status, created_at FROM student_requests WHERE id = ?",
        )
        .bind(request_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn pending_for_tutor(
        pool: &SqlitePool,
        tutor_id: i64,
    ) -> Result<Vec<PendingRequest>, sqlx::Error> {
        sqlx::query_as::<_, PendingRequest>(
            r#"
            SELECT r.id, r.student_id, u.name AS student_name, u.username, u.age,
                   u.timezone, u.subject, r.created_at
            FROM student_requests r
            JOIN users u ON u.id = r.student_id
            WHERE r.tutor_id = ? AND r.status = 'pending'
            ORDER BY r.created_at, r.id
            "#,
        )
        .bind(tutor_id)
        .fetch_all(pool)
        .await
    }

    pub async fn for_student(pool: &SqlitePool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, StudentRequest>(
            r#"
            SELECT id, student_id, tutor_id, status, created_at FROM student_requests
            WHERE student_id = ? ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    /// Decide a pending request. Returns false when it was already decided.
    pub async fn decide<'e, E>(
        executor: E,
        request_id: i64,
        status: RequestStatus,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE student_requests SET status = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(request_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_pending(pool: &SqlitePool, tutor_id: Option<i64>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM student_requests WHERE status = 'pending' AND (? IS NULL OR tutor_id = ?)",
        )
        .bind(tutor_id)
        .bind(tutor_id)
        .fetch_one(pool)
        .await
    }
}
