use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// System-wide counters for the superadmin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_users: i64,
    pub tutors: i64,
    pub students: i64,
    pub superadmins: i64,
    pub archived: i64,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub scheduled_lessons: i64,
    pub homework_assigned: i64,
    pub homework_submitted: i64,
    pub total_messages: i64,
    pub pending_requests: i64,
    /// Sum of `cost` over completed lessons.
    pub total_revenue: i64,
    pub updated_at: String,
}

/// Counters for one tutor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TutorStats {
    pub active_students: i64,
    pub scheduled_lessons: i64,
    pub completed_lessons: i64,
    pub cancelled_lessons: i64,
    pub homework_assigned: i64,
    pub homework_submitted: i64,
    pub homework_checked: i64,
    pub pending_requests: i64,
    pub revenue: i64,
}

async fn count(pool: &SqlitePool, sql: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(sql).fetch_one(pool).await
}

async fn count_for(pool: &SqlitePool, sql: &str, id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(sql).bind(id).fetch_one(pool).await
}

impl SystemStats {
    pub async fn collect(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            total_users: count(pool, "SELECT COUNT(*) FROM users").await?,
            tutors: count(pool, "SELECT COUNT(*) FROM users WHERE role = 'admin'").await?,
            students: count(pool, "SELECT COUNT(*) FROM users WHERE role = 'student'").await?,
            superadmins: count(pool, "SELECT COUNT(*) FROM users WHERE role = 'superadmin'").await?,
            archived: count(pool, "SELECT COUNT(*) FROM users WHERE role = 'archived'").await?,
            total_lessons: count(pool, "SELECT COUNT(*) FROM lessons").await?,
            completed_lessons: count(pool, "SELECT COUNT(*) FROM lessons WHERE status = 'completed'")
                .await?,
            scheduled_lessons: count(
                pool,
                "SELECT COUNT(*) FROM lessons WHERE status IN ('scheduled', 'rescheduled')",
            )
            .await?,
            homework_assigned: count(pool, "SELECT COUNT(*) FROM homework").await?,
            homework_submitted: count(
                pool,
                "SELECT COUNT(*) FROM homework WHERE status IN ('submitted', 'checked', 'completed')",
            )
            .await?,
            total_messages: count(pool, "SELECT COUNT(*) FROM messages").await?,
            pending_requests: count(
                pool,
                "SELECT COUNT(*) FROM student_requests WHERE status = 'pending'",
            )
            .await?,
            total_revenue: count(
                pool,
                "SELECT COALESCE(SUM(cost), 0) FROM lessons WHERE status = 'completed'",
            )
            .await?,
            updated_at: Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        })
    }
}

impl TutorStats {
    pub async fn collect(pool: &SqlitePool, tutor_id: i64) -> Result<Self, sqlx::Error> {
        Ok(Self {
            active_students: count_for(
                pool,
                r#"
                SELECT COUNT(*) FROM users WHERE role = 'student' AND id IN (
                    SELECT student_id FROM student_requests WHERE tutor_id = ?1 AND status = 'accepted'
                    UNION
                    SELECT student_id FROM lessons WHERE tutor_id = ?1
                )
                "#,
                tutor_id,
            )
            .await?,
            scheduled_lessons: count_for(
                pool,
                "SELECT COUNT(*) FROM lessons WHERE tutor_id = ? AND status IN ('scheduled', 'rescheduled')",
                tutor_id,
            )
            .await?,
            completed_lessons: count_for(
                pool,
                "SELECT COUNT(*) FROM lessons WHERE tutor_id = ? AND status = 'completed'",
                tutor_id,
            )
            .await?,
            cancelled_lessons: count_for(
                pool,
                "SELECT COUNT(*) FROM lessons WHERE tutor_id = ? AND status = 'cancelled'",
                tutor_id,
            )
            .await?,
            homework_assigned: count_for(
                pool,
                "SELECT COUNT(*) FROM homework WHERE tutor_id = ? AND status = 'assigned'",
                tutor_id,
            )
            .await?,
            homework_submitted: count_for(
                pool,
                "SELECT COUNT(*) FROM homework WHERE tutor_id = ? AND status = 'submitted'",
                tutor_id,
            )
            .await?,
            homework_checked: count_for(
                pool,
                "SELECT COUNT(*) FROM homework WHERE tutor_id = ? AND status IN ('checked', 'completed')",
                tutor_id,
            )
            .await?,
            pending_requests: count_for(
                pool,
                "SELECT COUNT(*) FROM student_requests WHERE tutor_id = ? AND status = 'pending'",
                tutor_id,
            )
            .await?,
            revenue: count_for(
                pool,
                "SELECT COALESCE(SUM(cost), 0) FROM lessons WHERE tutor_id = ? AND status = 'completed'",
                tutor_id,
            )
            .await?,
        })
    }
}
