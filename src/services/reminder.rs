use chrono::{Duration, NaiveDateTime};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::database::{connection::DatabaseManager, models::*};
use crate::services::notifications::NotificationService;
use crate::utils::datetime::{format_date_time, local_now};

/// How far ahead a lesson counts as "starting soon".
pub const LESSON_REMINDER_WINDOW_MINUTES: i64 = 60;

/// What one pass of the reminder job sent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderReport {
    pub lessons: usize,
    pub homework: usize,
}

pub struct ReminderService {
    notifications: NotificationService,
    db: Arc<DatabaseManager>,
    scheduler: JobScheduler,
    interval_minutes: u32,
    utc_offset_hours: i32,
}

impl ReminderService {
    pub async fn new(
        notifications: NotificationService,
        db: Arc<DatabaseManager>,
        interval_minutes: u32,
        utc_offset_hours: i32,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            notifications,
            db,
            scheduler,
            interval_minutes,
            utc_offset_hours,
        })
    }

    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let notifications = self.notifications.clone();
        let db = self.db.clone();
        let offset = self.utc_offset_hours;

        let schedule = format!("0 */{} * * * *", self.interval_minutes);
        let reminder_job = Job::new_async(schedule.as_str(), move |_uuid, _l| {
            let notifications = notifications.clone();
            let db = db.clone();
            Box::pin(async move {
                match check_and_send_reminders(&db, &notifications, local_now(offset)).await {
                    Ok(report) if report != ReminderReport::default() => {
                        tracing::info!(
                            "Sent {} lesson and {} homework reminders",
                            report.lessons,
                            report.homework
                        );
                    }
                    Ok(_) => tracing::debug!("No reminders due"),
                    Err(e) => tracing::error!("Failed to send reminders: {}", e),
                }
            })
        })?;

        self.scheduler.add(reminder_job).await?;
        self.scheduler.start().await?;

        tracing::info!(
            "Reminder service started - checking every {} minutes",
            self.interval_minutes
        );
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    /// Run one pass immediately.
    pub async fn check_reminders_now(&self) -> Result<ReminderReport, sqlx::Error> {
        check_and_send_reminders(&self.db, &self.notifications, local_now(self.utc_offset_hours)).await
    }
}

/// One pass over lessons starting within the window and homework whose
/// reminder time has passed. `now` is local wall-clock time.
///
/// A lesson is marked reminded once at least one participant got the
/// message, so it is never reminded twice.
pub async fn check_and_send_reminders(
    db: &DatabaseManager,
    notifications: &NotificationService,
    now: NaiveDateTime,
) -> Result<ReminderReport, sqlx::Error> {
    let mut report = ReminderReport::default();

    let after = format_date_time(now);
    let until = format_date_time(now + Duration::minutes(LESSON_REMINDER_WINDOW_MINUTES));

    for lesson in Lesson::due_for_reminder(&db.pool, &after, &until).await? {
        let student_name = display_name(db, lesson.student_id).await?;
        let tutor_name = display_name(db, lesson.tutor_id).await?;

        let to_student = notifications
            .lesson_reminder(lesson.student_id, &lesson, &tutor_name)
            .await;
        let to_tutor = notifications
            .lesson_reminder(lesson.tutor_id, &lesson, &student_name)
            .await;

        if to_student || to_tutor {
            LessonReminder::create(&db.pool, lesson.id).await?;
            report.lessons += 1;
        } else {
            tracing::warn!("Lesson {} reminder could not be delivered", lesson.id);
        }
    }

    for homework in Homework::due_reminders(&db.pool, &after).await? {
        if notifications.homework_reminder(&homework).await {
            Homework::mark_reminded(&db.pool, homework.id).await?;
            report.homework += 1;
        } else {
            tracing::warn!("Homework {} reminder could not be delivered", homework.id);
        }
    }

    Ok(report)
}

async fn display_name(db: &DatabaseManager, user_id: i64) -> Result<String, sqlx::Error> {
    Ok(User::find_by_id(&db.pool, user_id)
        .await?
        .map(|u| u.display_name())
        .unwrap_or_else(|| format!("id {user_id}")))
}
