mod common;

use anyhow::Result;
use common::{seed_student, seed_tutor, setup_env};
use tutor_bot::database::models::*;
use tutor_bot::services::roles::Role;

const TUTOR: i64 = 100;
const STUDENT: i64 = 200;

#[tokio::test]
async fn test_new_request_escapes_student_fields() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    let student = seed_student(env.db(), STUDENT, TUTOR, "<b>Anna</b>").await?;

    assert!(env.notifications().new_request(TUTOR, &student, 9).await);

    let sent = env.notifier.sent_to(TUTOR);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("&lt;b&gt;Anna&lt;/b&gt;"));
    assert!(sent[0].text.contains("@student200"));
    assert!(sent[0].has_keyboard);
    Ok(())
}

#[tokio::test]
async fn test_approval_includes_lesson_link() -> Result<()> {
    let env = setup_env().await?;
    let tutor = seed_tutor(env.db(), TUTOR, "Maria").await?;

    env.notifications().request_approved(STUDENT, &tutor).await;
    env.notifications().request_rejected(STUDENT, "Maria").await;

    let sent = env.notifier.sent_to(STUDENT);
    assert_eq!(sent.len(), 2);
    assert!(sent[0].text.contains("https://meet.example.com/room"));
    assert!(sent[1].text.contains("/start"));
    Ok(())
}

#[tokio::test]
async fn test_text_homework_is_one_message() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;
    let hw = Homework::assign(&env.db().pool, STUDENT, TUTOR, ContentType::Text, "Read page 5", None).await?;

    assert!(env.notifications().homework_assigned(&hw, "Maria").await);

    let sent = env.notifier.sent_to(STUDENT);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("Read page 5"));
    assert!(sent[0].has_keyboard);
    Ok(())
}

#[tokio::test]
async fn test_media_homework_forwards_the_file() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;
    let hw = Homework::assign(&env.db().pool, STUDENT, TUTOR, ContentType::Voice, "voice-file", Some("Listen")).await?;

    assert!(env.notifications().homework_assigned(&hw, "Maria").await);

    let sent = env.notifier.sent_to(STUDENT);
    assert_eq!(sent.len(), 3);
    assert!(sent[0].text.contains("Listen"));
    assert_eq!(sent[1].media, Some(ContentType::Voice));
    assert_eq!(sent[1].text, "voice-file");
    assert!(sent[2].has_keyboard);
    Ok(())
}

#[tokio::test]
async fn test_submission_goes_to_the_tutor() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;
    let hw = Homework::assign(&env.db().pool, STUDENT, TUTOR, ContentType::Text, "Essay", None).await?;
    Homework::submit(&env.db().pool, hw.id, ContentType::Photo, "photo-file").await?;
    let hw = Homework::find_by_id(&env.db().pool, hw.id).await?.unwrap();

    assert!(env.notifications().homework_submitted(&hw, "Anna").await);

    let sent = env.notifier.sent_to(TUTOR);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].media, Some(ContentType::Photo));
    assert!(sent[1].text.contains("Anna"));
    assert!(sent[1].has_keyboard);
    Ok(())
}

#[tokio::test]
async fn test_lesson_notifications_reach_the_student() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR, "Maria").await?;
    seed_student(env.db(), STUDENT, TUTOR, "Anna").await?;
    let lesson = Lesson::create(&env.db().pool, STUDENT, TUTOR, "2030-03-15", "16:00", Some("Math"), 0).await?;

    env.notifications().lesson_added(&lesson, "Maria").await;
    env.notifications().lesson_rescheduled(&lesson, "2030-03-14", "10:00").await;
    env.notifications().lesson_cancelled(&lesson).await;

    let sent = env.notifier.sent_to(STUDENT);
    assert_eq!(sent.len(), 3);
    assert!(sent[0].text.contains("Fri 15.03.2030 16:00"));
    assert!(sent[0].text.contains("Math"));
    assert!(sent[1].text.contains("Thu 14.03.2030 10:00"));
    assert!(env.notifier.sent_to(TUTOR).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_direct_message_and_role_change() -> Result<()> {
    let env = setup_env().await?;

    env.notifications().direct_message(TUTOR, "Anna", "See you <soon>").await;
    env.notifications().role_changed(STUDENT, Role::Admin).await;

    assert!(env.notifier.sent_to(TUTOR)[0].text.contains("See you &lt;soon&gt;"));
    assert!(env.notifier.sent_to(STUDENT)[0].text.contains("Tutor"));
    Ok(())
}
