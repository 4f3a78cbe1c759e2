use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::lesson::Lesson;
use super::vacation::VacationPeriod;
use crate::utils::datetime::DATE_FORMAT;

/// A weekly template slot: this student every `day_of_week` at `time`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StandardSchedule {
    pub id: i64,
    pub tutor_id: i64,
    pub student_id: i64,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: i64,
    pub time: String,
    pub subject: Option<String>,
    pub created_at: String,
}

/// First date strictly after `today` that falls on `day_of_week` (0 = Monday).
pub fn next_occurrence(today: NaiveDate, day_of_week: u32) -> NaiveDate {
    let current = today.weekday().num_days_from_monday();
    let mut days_ahead = (day_of_week + 7 - current) % 7;
    if days_ahead == 0 {
        days_ahead = 7;
    }
    today + Duration::days(i64::from(days_ahead))
}

impl StandardSchedule {
    pub async fn create(
        pool: &SqlitePool,
        tutor_id: i64,
        student_id: i64,
        day_of_week: u32,
        time: &str,
        subject: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO standard_schedule (tutor_id, student_id, day_of_week, time, subject)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(tutor_id)
        .bind(student_id)
        .bind(i64::from(day_of_week))
        .bind(time)
        .bind(subject)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &SqlitePool, schedule_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, StandardSchedule>(
            "SELECT id, tutor_id, student_id, day_of_week, time, subject, created_at FROM standard_schedule WHERE id = ?",
        )
        .bind(schedule_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn for_tutor(pool: &SqlitePool, tutor_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, StandardSchedule>(
            r#"
            SELECT id, tutor_id, student_id, day_of_week, time, subject, created_at
            FROM standard_schedule WHERE tutor_id = ?
            ORDER BY day_of_week, time
            "#,
        )
        .bind(tutor_id)
        .fetch_all(pool)
        .await
    }

    pub async fn for_pair(
        pool: &SqlitePool,
        tutor_id: i64,
        student_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, StandardSchedule>(
            r#"
            SELECT id, tutor_id, student_id, day_of_week, time, subject, created_at
            FROM standard_schedule WHERE tutor_id = ? AND student_id = ?
            ORDER BY day_of_week, time
            "#,
        )
        .bind(tutor_id)
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    /// Expand the weekly template of a tutor/student pair into concrete
    /// lessons for the next `weeks` weeks.
    ///
    /// Dates inside a vacation and slots that already hold a lesson for the
    /// pair are skipped, so running this twice creates nothing new. All
    /// lessons of one run are written in a single transaction.
    pub async fn generate_lessons(
        pool: &SqlitePool,
        tutor_id: i64,
        student_id: i64,
        weeks: u32,
        today: NaiveDate,
        cost: i64,
    ) -> Result<Vec<Lesson>, sqlx::Error> {
        let templates = Self::for_pair(pool, tutor_id, student_id).await?;
        let vacations =
            VacationPeriod::for_tutor(pool, tutor_id, &today.format(DATE_FORMAT).to_string()).await?;

        let mut tx = pool.begin().await?;
        let mut ids = Vec::new();

        for template in templates {
            let Ok(day) = u32::try_from(template.day_of_week) else {
                continue;
            };
            let first = next_occurrence(today, day);

            for week in 0..weeks {
                let date = (first + Duration::weeks(i64::from(week)))
                    .format(DATE_FORMAT)
                    .to_string();

                if vacations.iter().any(|v| v.contains(&date)) {
                    continue;
                }

                let existing: i64 = sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM lessons
                    WHERE tutor_id = ? AND student_id = ? AND lesson_date = ? AND lesson_time = ?
                      AND status != 'cancelled'
                    "#,
                )
                .bind(tutor_id)
                .bind(student_id)
                .bind(&date)
                .bind(&template.time)
                .fetch_one(&mut *tx)
                .await?;
                if existing > 0 {
                    continue;
                }

                let id = Lesson::insert(
                    &mut *tx,
                    student_id,
                    tutor_id,
                    &date,
                    &template.time,
                    template.subject.as_deref(),
                    cost,
                )
                .await?;
                ids.push(id);
            }
        }
        tx.commit().await?;

        let mut created = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(lesson) = Lesson::find_by_id(pool, id).await? {
                created.push(lesson);
            }
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn next_occurrence_is_strictly_after_today() {
        // 2024-01-01 is a Monday
        let monday = date("2024-01-01");
        assert_eq!(next_occurrence(monday, 0), date("2024-01-08"));
        assert_eq!(next_occurrence(monday, 1), date("2024-01-02"));
        assert_eq!(next_occurrence(monday, 6), date("2024-01-07"));
    }

    #[test]
    fn next_occurrence_wraps_around_the_week() {
        let friday = date("2024-01-05");
        assert_eq!(next_occurrence(friday, 0), date("2024-01-08"));
        assert_eq!(next_occurrence(friday, 4), date("2024-01-12"));
    }
}
