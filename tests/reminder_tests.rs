mod common;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use common::{seed_student, seed_tutor, setup_env, setup_env_with, RecordingNotifier};
use tutor_bot::database::models::*;
use tutor_bot::services::reminder::{check_and_send_reminders, ReminderReport};

const TUTOR: i64 = 100;
const STUDENT: i64 = 200;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 5, 10)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

#[tokio::test]
async fn test_lesson_within_window_is_reminded_once() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;
    let lesson = Lesson::create(&env.db().pool, STUDENT, TUTOR, "2030-05-10", "12:30", Some("Math"), 1500).await?;

    let report = check_and_send_reminders(env.db(), env.notifications(), at(12, 0)).await?;
    assert_eq!(report, ReminderReport { lessons: 1, homework: 0 });
    assert!(LessonReminder::exists(&env.db().pool, lesson.id).await?);

    assert_eq!(env.notifier.sent_to(STUDENT).len(), 1);
    assert_eq!(env.notifier.sent_to(TUTOR).len(), 1);
    assert!(env.notifier.sent_to(STUDENT)[0].text.contains("Maria"));
    assert!(env.notifier.sent_to(TUTOR)[0].text.contains("Anna"));

    let again = check_and_send_reminders(env.db(), env.notifications(), at(12, 10)).await?;
    assert_eq!(again, ReminderReport::default());
    assert_eq!(env.notifier.sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_lessons_outside_window_are_left_alone() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;
    Lesson::create(&env.db().pool, STUDENT, TUTOR, "2030-05-10", "14:30", None, 0).await?;
    Lesson::create(&env.db().pool, STUDENT, TUTOR, "2030-05-10", "11:00", None, 0).await?;
    let cancelled = Lesson::create(&env.db().pool, STUDENT, TUTOR, "2030-05-10", "12:15", None, 0).await?;
    Lesson::set_status(&env.db().pool, cancelled.id, LessonStatus::Cancelled).await?;

    let report = check_and_send_reminders(env.db(), env.notifications(), at(12, 0)).await?;
    assert_eq!(report, ReminderReport::default());
    assert!(env.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_undelivered_reminder_is_retried() -> Result<()> {
    let env = setup_env_with(RecordingNotifier::failing(), Vec::new()).await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;
    let lesson = Lesson::create(&env.db().pool, STUDENT, TUTOR, "2030-05-10", "12:30", None, 0).await?;

    let report = check_and_send_reminders(env.db(), env.notifications(), at(12, 0)).await?;
    assert_eq!(report.lessons, 0);
    assert!(!LessonReminder::exists(&env.db().pool, lesson.id).await?);

    check_and_send_reminders(env.db(), env.notifications(), at(12, 5)).await?;
    assert_eq!(env.notifier.sent().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_rescheduled_lesson_is_reminded_again() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;
    let lesson = Lesson::create(&env.db().pool, STUDENT, TUTOR, "2030-05-10", "12:30", None, 0).await?;

    check_and_send_reminders(env.db(), env.notifications(), at(12, 0)).await?;
    assert!(Lesson::reschedule(&env.db().pool, lesson.id, "2030-05-10", "18:00").await?);
    assert!(!LessonReminder::exists(&env.db().pool, lesson.id).await?);

    let report = check_and_send_reminders(env.db(), env.notifications(), at(17, 30)).await?;
    assert_eq!(report.lessons, 1);
    assert_eq!(env.notifier.sent().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_homework_reminder_fires_after_its_time() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;

    let hw = Homework::assign(&env.db().pool, STUDENT, TUTOR, ContentType::Text, "Essay", None).await?;
    Homework::set_reminder(&env.db().pool, hw.id, "2030-05-10", "12:00").await?;

    let early = check_and_send_reminders(env.db(), env.notifications(), at(11, 59)).await?;
    assert_eq!(early.homework, 0);

    let report = check_and_send_reminders(env.db(), env.notifications(), at(12, 0)).await?;
    assert_eq!(report.homework, 1);
    let sent = env.notifier.sent_to(STUDENT);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].has_keyboard);

    let again = check_and_send_reminders(env.db(), env.notifications(), at(13, 0)).await?;
    assert_eq!(again.homework, 0);
    Ok(())
}

#[tokio::test]
async fn test_submitted_homework_is_not_reminded() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;

    let hw = Homework::assign(&env.db().pool, STUDENT, TUTOR, ContentType::Text, "Essay", None).await?;
    Homework::set_reminder(&env.db().pool, hw.id, "2030-05-10", "12:00").await?;
    Homework::submit(&env.db().pool, hw.id, ContentType::Text, "Done").await?;

    let report = check_and_send_reminders(env.db(), env.notifications(), at(13, 0)).await?;
    assert_eq!(report.homework, 0);
    assert!(env.notifier.sent().is_empty());
    Ok(())
}
