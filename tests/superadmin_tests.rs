mod common;

use anyhow::Result;
use common::{seed_student, seed_tutor, setup_env, setup_env_with, RecordingNotifier};
use tutor_bot::bot::commands::superadmin::{apply_role, create_tutor, remove_tutor};
use tutor_bot::database::models::*;
use tutor_bot::services::roles::Role;

fn new_tutor(id: i64, name: &str) -> NewTutor {
    NewTutor {
        id,
        name: name.to_string(),
        username: Some("newtutor".to_string()),
        subjects: "Math".to_string(),
        cost: 1200,
        link: None,
    }
}

#[tokio::test]
async fn test_create_tutor_for_unknown_user() -> Result<()> {
    let env = setup_env().await?;

    let tutor = create_tutor(&env.ctx, &new_tutor(300, "Olga")).await?;
    assert_eq!(tutor.name, "Olga");
    assert_eq!(tutor.cost, 1200);

    let user = User::find_by_id(&env.db().pool, 300).await?.unwrap();
    assert_eq!(user.role(), Role::Admin);
    assert_eq!(Tutor::list_active(&env.db().pool).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_create_tutor_keeps_superadmin_role() -> Result<()> {
    let env = setup_env().await?;
    User::upsert_with_role(&mut *env.db().pool.acquire().await?, 1, None, "Root", Role::Superadmin).await?;

    create_tutor(&env.ctx, &new_tutor(1, "Root Tutor")).await?;

    let user = User::find_by_id(&env.db().pool, 1).await?.unwrap();
    assert_eq!(user.role(), Role::Superadmin);
    assert!(Tutor::find_by_id(&env.db().pool, 1).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_remove_tutor_archives_and_keeps_history() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), 100, "Maria").await?;
    seed_student(env.db(), 200, 100, "Anna").await?;
    let lesson = Lesson::create(&env.db().pool, 200, 100, "2030-01-01", "10:00", None, 0).await?;
    let hw = Homework::assign(&env.db().pool, 200, 100, ContentType::Text, "Essay", None).await?;

    assert!(remove_tutor(&env.ctx, 100).await?);
    assert!(!remove_tutor(&env.ctx, 100).await?);

    assert!(Tutor::find_by_id(&env.db().pool, 100).await?.is_none());
    let user = User::find_by_id(&env.db().pool, 100).await?.unwrap();
    assert_eq!(user.role(), Role::Archived);

    assert!(Lesson::find_by_id(&env.db().pool, lesson.id).await?.is_some());
    assert!(Homework::find_by_id(&env.db().pool, hw.id).await?.is_some());
    assert!(Tutor::list_active(&env.db().pool).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_promoting_a_student_creates_a_profile() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), 100, "Maria").await?;
    seed_student(env.db(), 200, 100, "Anna").await?;

    assert!(apply_role(&env.ctx, 200, Role::Admin).await?);

    let user = User::find_by_id(&env.db().pool, 200).await?.unwrap();
    assert_eq!(user.role(), Role::Admin);
    let profile = Tutor::find_by_id(&env.db().pool, 200).await?.unwrap();
    assert_eq!(profile.name, "Anna");
    assert_eq!(profile.cost, DEFAULT_LESSON_COST);

    // Demoting keeps the profile but hides it from registration.
    assert!(apply_role(&env.ctx, 200, Role::Student).await?);
    assert!(Tutor::find_by_id(&env.db().pool, 200).await?.is_some());
    let active: Vec<i64> = Tutor::list_active(&env.db().pool).await?.iter().map(|t| t.id).collect();
    assert_eq!(active, vec![100]);
    Ok(())
}

#[tokio::test]
async fn test_promotion_keeps_existing_profile() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), 100, "Maria").await?;
    User::set_role(&env.db().pool, 100, Role::Student).await?;

    assert!(apply_role(&env.ctx, 100, Role::Superadmin).await?);
    let profile = Tutor::find_by_id(&env.db().pool, 100).await?.unwrap();
    assert_eq!(profile.cost, 1500);
    Ok(())
}

#[tokio::test]
async fn test_role_change_for_unknown_user() -> Result<()> {
    let env = setup_env_with(RecordingNotifier::default(), vec![1]).await?;
    assert!(!apply_role(&env.ctx, 12345, Role::Admin).await?);
    assert!(User::find_by_id(&env.db().pool, 12345).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_configured_superadmin_is_recognized_without_a_row() -> Result<()> {
    let env = setup_env_with(RecordingNotifier::default(), vec![1]).await?;

    assert!(env.ctx.is_superadmin(1, None));
    assert!(env.ctx.can_tutor(1, None));
    assert_eq!(env.ctx.menu_role(1, None), Role::Superadmin);

    assert!(!env.ctx.is_superadmin(2, None));
    assert_eq!(env.ctx.menu_role(2, None), Role::Unregistered);
    Ok(())
}
