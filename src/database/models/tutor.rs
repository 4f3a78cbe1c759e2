use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};

const TUTOR_COLUMNS: &str = "id, name, username, subjects, cost, link, created_at";

/// Default lesson price for new tutor profiles.
pub const DEFAULT_LESSON_COST: i64 = 1000;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tutor {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
    pub subjects: Option<String>,
    pub cost: i64,
    pub link: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTutor {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
    pub subjects: String,
    pub cost: i64,
    pub link: Option<String>,
}

/// Profile fields a tutor can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorField {
    Name,
    Subjects,
    Cost,
    Link,
}

impl TutorField {
    fn column(&self) -> &'static str {
        match self {
            TutorField::Name => "name",
            TutorField::Subjects => "subjects",
            TutorField::Cost => "cost",
            TutorField::Link => "link",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.column()
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(TutorField::Name),
            "subjects" => Some(TutorField::Subjects),
            "cost" => Some(TutorField::Cost),
            "link" => Some(TutorField::Link),
            _ => None,
        }
    }
}

/// A validated new value for one profile field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorUpdate {
    Name(String),
    Subjects(String),
    Cost(i64),
    Link(Option<String>),
}

impl TutorUpdate {
    pub fn field(&self) -> TutorField {
        match self {
            TutorUpdate::Name(_) => TutorField::Name,
            TutorUpdate::Subjects(_) => TutorField::Subjects,
            TutorUpdate::Cost(_) => TutorField::Cost,
            TutorUpdate::Link(_) => TutorField::Link,
        }
    }
}

impl Tutor {
    pub async fn upsert(conn: &mut SqliteConnection, tutor: &NewTutor) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tutors (id, name, username, subjects, cost, link)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                username = excluded.username,
                subjects = excluded.subjects,
                cost = excluded.cost,
                link = excluded.link
            "#,
        )
        .bind(tutor.id)
        .bind(&tutor.name)
        .bind(&tutor.username)
        .bind(&tutor.subjects)
        .bind(tutor.cost)
        .bind(&tutor.link)
        .execute(&mut *conn)
        .await?;

        sqlx::query_as::<_, Tutor>(&format!("SELECT {TUTOR_COLUMNS} FROM tutors WHERE id = ?"))
            .bind(tutor.id)
            .fetch_optional(conn)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &SqlitePool, tutor_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tutor>(&format!("SELECT {TUTOR_COLUMNS} FROM tutors WHERE id = ?"))
            .bind(tutor_id)
            .fetch_optional(pool)
            .await
    }

    /// Tutors whose user account is not archived, for the registration keyboard.
    pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tutor>(
            r#"
            SELECT t.id, t.name, t.username, t.subjects, t.cost, t.link, t.created_at
            FROM tutors t
            JOIN users u ON u.id = t.id
            WHERE u.role IN ('admin', 'superadmin')
            ORDER BY t.name
            "#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tutor>(&format!("SELECT {TUTOR_COLUMNS} FROM tutors ORDER BY name"))
            .fetch_all(pool)
            .await
    }

    pub async fn update(pool: &SqlitePool, tutor_id: i64, update: &TutorUpdate) -> Result<bool, sqlx::Error> {
        let sql = format!("UPDATE tutors SET {} = ? WHERE id = ?", update.field().column());
        let query = match update {
            TutorUpdate::Name(value) | TutorUpdate::Subjects(value) => sqlx::query(&sql).bind(value),
            TutorUpdate::Cost(cost) => sqlx::query(&sql).bind(cost),
            TutorUpdate::Link(link) => sqlx::query(&sql).bind(link),
        };
        let result = query.bind(tutor_id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete<'e, E>(executor: E, tutor_id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM tutors WHERE id = ?")
            .bind(tutor_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
