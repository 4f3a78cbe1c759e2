use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::fmt;

const HOMEWORK_COLUMNS: &str = "id, student_id, tutor_id, content_type, content_data, description, \
     status, submission_type, submission_data, submitted_at, reminder_date, reminder_time, \
     reminded_at, assigned_at";

/// Kind of payload attached to an assignment or a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Photo,
    File,
    Voice,
    Video,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Text,
        ContentType::Photo,
        ContentType::File,
        ContentType::Voice,
        ContentType::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Photo => "photo",
            ContentType::File => "file",
            ContentType::Voice => "voice",
            ContentType::Video => "video",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Text => "📝 Text",
            ContentType::Photo => "🖼 Photo",
            ContentType::File => "📎 File",
            ContentType::Voice => "🎤 Voice",
            ContentType::Video => "🎬 Video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ContentType::Text),
            "photo" => Some(ContentType::Photo),
            "file" => Some(ContentType::File),
            "voice" => Some(ContentType::Voice),
            "video" => Some(ContentType::Video),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeworkStatus {
    Assigned,
    Submitted,
    Checked,
    Completed,
}

impl HomeworkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomeworkStatus::Assigned => "assigned",
            HomeworkStatus::Submitted => "submitted",
            HomeworkStatus::Checked => "checked",
            HomeworkStatus::Completed => "completed",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            HomeworkStatus::Assigned => "📌",
            HomeworkStatus::Submitted => "📤",
            HomeworkStatus::Checked => "✅",
            HomeworkStatus::Completed => "🏁",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(HomeworkStatus::Assigned),
            "submitted" => Some(HomeworkStatus::Submitted),
            "checked" => Some(HomeworkStatus::Checked),
            "completed" => Some(HomeworkStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Homework {
    pub id: i64,
    pub student_id: i64,
    pub tutor_id: i64,
    pub content_type: String,
    /// Text body, or a Telegram file id for media.
    pub content_data: String,
    pub description: Option<String>,
    pub status: String,
    pub submission_type: Option<String>,
    pub submission_data: Option<String>,
    pub submitted_at: Option<String>,
    pub reminder_date: Option<String>,
    pub reminder_time: Option<String>,
    pub reminded_at: Option<String>,
    pub assigned_at: String,
}

impl Homework {
    pub fn status(&self) -> HomeworkStatus {
        HomeworkStatus::parse(&self.status).unwrap_or(HomeworkStatus::Assigned)
    }

    pub fn content_type(&self) -> ContentType {
        ContentType::parse(&self.content_type).unwrap_or(ContentType::Text)
    }

    pub fn submission_type(&self) -> Option<ContentType> {
        self.submission_type.as_deref().and_then(ContentType::parse)
    }

    /// Short one-line title for lists.
    pub fn title(&self) -> String {
        let base = match (&self.description, self.content_type()) {
            (Some(d), _) if !d.is_empty() => d.clone(),
            (_, ContentType::Text) => self.content_data.clone(),
            (_, other) => other.label().to_string(),
        };
        let mut title: String = base.chars().take(40).collect();
        if base.chars().count() > 40 {
            title.push('…');
        }
        title
    }

    pub async fn assign(
        pool: &SqlitePool,
        student_id: i64,
        tutor_id: i64,
        content_type: ContentType,
        content_data: &str,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO homework (student_id, tutor_id, content_type, content_data, description, status)
            VALUES (?, ?, ?, ?, ?, 'assigned')
            "#,
        )
        .bind(student_id)
        .bind(tutor_id)
        .bind(content_type.as_str())
        .bind(content_data)
        .bind(description)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &SqlitePool, homework_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Homework>(&format!(
            "SELECT {HOMEWORK_COLUMNS} FROM homework WHERE id = ?"
        ))
        .bind(homework_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn for_student(pool: &SqlitePool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Homework>(&format!(
            "SELECT {HOMEWORK_COLUMNS} FROM homework WHERE student_id = ? ORDER BY assigned_at DESC, id DESC"
        ))
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    pub async fn for_tutor(pool: &SqlitePool, tutor_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Homework>(&format!(
            "SELECT {HOMEWORK_COLUMNS} FROM homework WHERE tutor_id = ? ORDER BY assigned_at DESC, id DESC"
        ))
        .bind(tutor_id)
        .fetch_all(pool)
        .await
    }

    /// Store a submission. Only assigned homework can be submitted.
    pub async fn submit(
        pool: &SqlitePool,
        homework_id: i64,
        submission_type: ContentType,
        submission_data: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE homework
            SET status = 'submitted', submission_type = ?, submission_data = ?,
                submitted_at = datetime('now')
            WHERE id = ? AND status = 'assigned'
            "#,
        )
        .bind(submission_type.as_str())
        .bind(submission_data)
        .bind(homework_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_checked(pool: &SqlitePool, homework_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE homework SET status = 'checked' WHERE id = ? AND status = 'submitted'",
        )
        .bind(homework_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_reminder(
        pool: &SqlitePool,
        homework_id: i64,
        reminder_date: &str,
        reminder_time: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE homework SET reminder_date = ?, reminder_time = ?, reminded_at = NULL
            WHERE id = ?
            "#,
        )
        .bind(reminder_date)
        .bind(reminder_time)
        .bind(homework_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Assigned homework whose reminder time (`YYYY-MM-DD HH:MM`) has passed.
    pub async fn due_reminders(pool: &SqlitePool, now: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Homework>(&format!(
            r#"
            SELECT {HOMEWORK_COLUMNS} FROM homework
            WHERE status = 'assigned'
              AND reminder_date IS NOT NULL AND reminder_time IS NOT NULL
              AND reminded_at IS NULL
              AND reminder_date || ' ' || reminder_time <= ?
            "#
        ))
        .bind(now)
        .fetch_all(pool)
        .await
    }

    pub async fn mark_reminded(pool: &SqlitePool, homework_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE homework SET reminded_at = datetime('now') WHERE id = ?")
            .bind(homework_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
