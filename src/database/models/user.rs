use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};

use crate::services::roles::Role;

const USER_COLUMNS: &str =
    "id, username, name, role, tutor_id, timezone, subject, age, created_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub name: Option<String>,
    pub role: String,
    pub tutor_id: Option<i64>,
    pub timezone: Option<String>,
    pub subject: Option<String>,
    pub age: Option<i64>,
    pub created_at: String,
}

/// Fields collected by the registration dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub id: i64,
    pub username: Option<String>,
    pub name: String,
    pub tutor_id: i64,
    pub timezone: String,
    pub subject: String,
    pub age: i64,
}

impl User {
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Unregistered)
    }

    /// Name to show in lists, falling back to the username or the id.
    pub fn display_name(&self) -> String {
        match (&self.name, &self.username) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(username)) => format!("@{username}"),
            _ => format!("id {}", self.id),
        }
    }

    pub async fn find_by_id(pool: &SqlitePool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or overwrite a student row. Re-registration after a rejected
    /// request goes through here as well.
    pub async fn upsert_student(conn: &mut SqliteConnection, student: &NewStudent) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, name, role, tutor_id, timezone, subject, age)
            VALUES (?, ?, ?, 'student', ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                name = excluded.name,
                role = 'student',
                tutor_id = excluded.tutor_id,
                timezone = excluded.timezone,
                subject = excluded.subject,
                age = excluded.age
            "#,
        )
        .bind(student.id)
        .bind(&student.username)
        .bind(&student.name)
        .bind(student.tutor_id)
        .bind(&student.timezone)
        .bind(&student.subject)
        .bind(student.age)
        .execute(&mut *conn)
        .await?;

        Self::fetch_in(conn, student.id).await
    }

    /// Insert a user with the given role, or change the role of an existing one.
    pub async fn upsert_with_role(
        conn: &mut SqliteConnection,
        user_id: i64,
        username: Option<&str>,
        name: &str,
        role: Role,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, name, role)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                username = COALESCE(excluded.username, users.username),
                name = COALESCE(users.name, excluded.name),
                role = excluded.role
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(name)
        .bind(role.as_str())
        .execute(&mut *conn)
        .await?;

        Self::fetch_in(conn, user_id).await
    }

    /// Reads a row back on the connection that just wrote it.
    async fn fetch_in(conn: &mut SqliteConnection, user_id: i64) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(conn)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Returns false when no such user exists.
    pub async fn set_role<'e, E>(executor: E, user_id: i64, role: Role) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_by_role(pool: &SqlitePool, role: Role) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY name"
        ))
        .bind(role.as_str())
        .fetch_all(pool)
        .await
    }

    /// Students linked to a tutor by an accepted request or by a lesson.
    pub async fn students_of_tutor(
        pool: &SqlitePool,
        tutor_id: i64,
        include_archived: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE id IN (
                SELECT student_id FROM student_requests WHERE tutor_id = ? AND status = 'accepted'
                UNION
                SELECT student_id FROM lessons WHERE tutor_id = ?
            )
            AND role != 'unregistered'
            AND (? OR role != 'archived')
            ORDER BY name
            "#
        ))
        .bind(tutor_id)
        .bind(tutor_id)
        .bind(include_archived)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_role(pool: &SqlitePool, role: Role) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(pool)
            .await
    }
}
