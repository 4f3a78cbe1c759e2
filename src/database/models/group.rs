use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::User;

/// A tutor's named group of students.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub tutor_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl Group {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        tutor_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            "INSERT INTO groups (tutor_id, name, description) VALUES (?, ?, ?)"
        )
        .bind(tutor_id)
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        group_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            "SELECT id, tutor_id, name, description, created_at FROM groups WHERE id = ?"
        )
        .bind(group_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn for_tutor(
        pool: &sqlx::SqlitePool,
        tutor_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            "SELECT id, tutor_id, name, description, created_at FROM groups WHERE tutor_id = ? ORDER BY name"
        )
        .bind(tutor_id)
        .fetch_all(pool)
        .await
    }

    /// Adding the same student twice is a no-op.
    pub async fn add_member(
        pool: &sqlx::SqlitePool,
        group_id: i64,
        student_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO group_members (group_id, student_id) VALUES (?, ?)")
            .bind(group_id)
            .bind(student_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn members(
        pool: &sqlx::SqlitePool,
        group_id: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.name, u.role, u.tutor_id, u.timezone, u.subject, u.age, u.created_at
            FROM group_members m
            JOIN users u ON u.id = m.student_id
            WHERE m.group_id = ?
            ORDER BY u.name
            "#
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }
}
