mod common;

use anyhow::Result;
use common::{seed_student, seed_tutor, setup_env, setup_env_with, RecordingNotifier};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::ChatId;
use tutor_bot::bot::dialogue::{is_cancel_text, reset, BotDialogue, State};
use tutor_bot::database::models::*;
use tutor_bot::services::registration::{
    begin, complete, BeginOutcome, RegistrationError, RegistrationForm, RegistrationState, Step,
    StudentIdentity,
};
use tutor_bot::services::roles::Role;
use tutor_bot::utils::validation::ValidationError;

const TUTOR_ID: i64 = 500;

/// Feed answers one by one, like consecutive chat messages.
fn drive(tutor_id: i64, answers: &[&str]) -> Step {
    let mut state = RegistrationState::ChoosingTutor.select_tutor(tutor_id).unwrap();
    let mut last = Step::Next(state.clone());
    for answer in answers {
        last = state.advance(answer);
        match &last {
            Step::Next(next) => state = next.clone(),
            Step::Retry(_) | Step::Complete(_) => {}
        }
    }
    last
}

fn form(tutor_id: i64, answers: &[&str; 4]) -> RegistrationForm {
    match drive(tutor_id, answers) {
        Step::Complete(form) => form,
        other => panic!("registration did not complete: {other:?}"),
    }
}

fn identity(id: i64) -> StudentIdentity {
    StudentIdentity {
        id,
        username: Some(format!("user{id}")),
    }
}

async fn request_count(pool: &sqlx::SqlitePool, student_id: i64) -> Result<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM student_requests WHERE student_id = ?")
            .bind(student_id)
            .fetch_one(pool)
            .await?,
    )
}

#[tokio::test]
async fn test_every_valid_answer_set_creates_one_student_and_one_notification() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR_ID, "Maria Ivanova").await?;

    let cases: [[&str; 4]; 6] = [
        ["Anna Smirnova", "15", "MSK", "Math"],
        ["  Boris  ", "5", "msk+2", "Physics"],
        ["Li", "100", "MSK-1", "Chemistry"],
        ["Дарья", "42", "мск+12", "English"],
        ["Jean-Luc Picard", "60", "MSK + 3", "  History "],
        ["Zoë", "18", "MSK-12", "Biology and a very long subject name"],
    ];

    for (i, answers) in cases.iter().enumerate() {
        let student_id = 1000 + i as i64;
        env.notifier.clear();

        match begin(&env.db().pool, student_id).await? {
            BeginOutcome::Started(state) => assert_eq!(state, RegistrationState::ChoosingTutor),
            other => panic!("unexpected outcome {other:?}"),
        }

        let registered = complete(
            &env.db().pool,
            env.notifications(),
            &identity(student_id),
            form(TUTOR_ID, answers),
        )
        .await?;
        assert!(registered.notified);

        let user = User::find_by_id(&env.db().pool, student_id).await?.unwrap();
        assert_eq!(user.role(), Role::Student);
        assert_eq!(user.tutor_id, Some(TUTOR_ID));
        assert_eq!(user.name.as_deref(), Some(answers[0].trim()));
        assert_eq!(user.subject.as_deref(), Some(answers[3].trim()));
        assert_eq!(request_count(&env.db().pool, student_id).await?, 1);

        let request = StudentRequest::find_by_id(&env.db().pool, registered.request_id)
            .await?
            .unwrap();
        assert_eq!(request.status(), RequestStatus::Pending);

        let sent = env.notifier.sent();
        assert_eq!(sent.len(), 1, "case {i} sent {sent:?}");
        assert_eq!(sent[0].user_id, TUTOR_ID);
        assert!(sent[0].has_keyboard);
    }

    Ok(())
}

#[tokio::test]
async fn test_timezone_is_normalized_before_storage() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR_ID, "Maria").await?;

    complete(
        &env.db().pool,
        env.notifications(),
        &identity(7),
        form(TUTOR_ID, &["Anna", "15", "мск+3", "Math"]),
    )
    .await?;

    let user = User::find_by_id(&env.db().pool, 7).await?.unwrap();
    assert_eq!(user.timezone.as_deref(), Some("MSK+3"));
    assert_eq!(user.age, Some(15));
    Ok(())
}

#[test]
fn test_bad_age_keeps_asking_for_age() {
    let age_state = RegistrationState::AwaitingAge {
        tutor_id: TUTOR_ID,
        name: "Anna".to_string(),
    };

    for input in ["abc", "", "fifteen", "15.5"] {
        assert_eq!(
            age_state.advance(input),
            Step::Retry(ValidationError::AgeNotNumber),
            "input {input:?}"
        );
    }
    for input in ["4", "0", "-3", "101", "250"] {
        assert_eq!(
            age_state.advance(input),
            Step::Retry(ValidationError::AgeOutOfRange),
            "input {input:?}"
        );
    }
}

#[test]
fn test_each_answer_moves_exactly_one_step() {
    let name_state = RegistrationState::AwaitingName { tutor_id: TUTOR_ID };
    assert_eq!(name_state.step_name(), "awaiting_name");

    let Step::Next(age_state) = name_state.advance("Anna") else {
        panic!("name refused");
    };
    assert_eq!(age_state.step_name(), "awaiting_age");

    let Step::Next(tz_state) = age_state.advance("15") else {
        panic!("age refused");
    };
    assert_eq!(tz_state.step_name(), "awaiting_timezone");

    assert!(matches!(
        tz_state.advance("UTC+3"),
        Step::Retry(ValidationError::InvalidTimezone)
    ));

    let Step::Next(subject_state) = tz_state.advance("MSK+1") else {
        panic!("timezone refused");
    };
    assert_eq!(subject_state.step_name(), "awaiting_subject");
    assert_eq!(
        subject_state.advance("   "),
        Step::Retry(ValidationError::EmptySubject)
    );
}

#[test]
fn test_short_name_is_refused() {
    assert_eq!(
        drive(TUTOR_ID, &["A"]),
        Step::Retry(ValidationError::NameTooShort)
    );
}

#[tokio::test]
async fn test_cancel_at_any_step_returns_to_idle_without_a_record() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR_ID, "Maria").await?;
    env.notifier.clear();

    let student_id = 42;
    let storage = InMemStorage::<State>::new();
    let dialogue: BotDialogue = Dialogue::new(storage, ChatId(student_id));

    let prefixes: [&[&str]; 4] = [&[], &["Anna"], &["Anna", "15"], &["Anna", "15", "MSK"]];
    let mut states = vec![RegistrationState::ChoosingTutor];
    for answers in prefixes {
        match drive(TUTOR_ID, answers) {
            Step::Next(state) => states.push(state),
            other => panic!("unexpected step {other:?}"),
        }
    }
    assert!(matches!(states[1], RegistrationState::AwaitingName { .. }));
    assert!(matches!(states[4], RegistrationState::AwaitingSubject { .. }));

    for state in states {
        dialogue.update(State::Registration(state.clone())).await?;
        assert!(reset(&dialogue).await?, "{state:?} was not active");
        assert_eq!(dialogue.get().await?, None, "{state:?} was kept");
    }
    assert!(!reset(&dialogue).await?);

    assert!(User::find_by_id(&env.db().pool, student_id).await?.is_none());
    assert_eq!(request_count(&env.db().pool, student_id).await?, 0);
    assert!(env.notifier.sent().is_empty());
    Ok(())
}

#[test]
fn test_cancel_button_wins_over_awaited_answer() {
    assert!(is_cancel_text("❌ Cancel"));
    assert!(is_cancel_text("  ❌ Cancel "));
    assert!(!is_cancel_text("Anna"));
    assert!(!is_cancel_text("Cancel"));
}

#[tokio::test]
async fn test_registered_user_short_circuits() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR_ID, "Maria").await?;
    seed_student(env.db(), 42, TUTOR_ID, "Anna").await?;
    env.notifier.clear();

    assert!(matches!(
        begin(&env.db().pool, 42).await?,
        BeginOutcome::AlreadyRegistered(user) if user.id == 42
    ));
    assert!(matches!(
        begin(&env.db().pool, TUTOR_ID).await?,
        BeginOutcome::AlreadyRegistered(_)
    ));

    let result = complete(
        &env.db().pool,
        env.notifications(),
        &identity(42),
        form(TUTOR_ID, &["Anna", "15", "MSK", "Math"]),
    )
    .await;
    assert!(matches!(result, Err(RegistrationError::AlreadyRegistered(42))));
    assert_eq!(request_count(&env.db().pool, 42).await?, 1);
    assert!(env.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_tutor_is_refused() -> Result<()> {
    let env = setup_env().await?;

    let result = complete(
        &env.db().pool,
        env.notifications(),
        &identity(42),
        form(999, &["Anna", "15", "MSK", "Math"]),
    )
    .await;

    assert!(matches!(result, Err(RegistrationError::TutorNotFound(999))));
    assert!(User::find_by_id(&env.db().pool, 42).await?.is_none());
    assert!(env.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rejected_student_can_register_again() -> Result<()> {
    let env = setup_env().await?;
    seed_tutor(env.db(), TUTOR_ID, "Maria").await?;
    seed_tutor(env.db(), 501, "Pavel").await?;

    let first = complete(
        &env.db().pool,
        env.notifications(),
        &identity(42),
        form(TUTOR_ID, &["Anna", "15", "MSK", "Math"]),
    )
    .await?;

    // What rejecting a request does.
    let mut tx = env.db().pool.begin().await?;
    assert!(StudentRequest::decide(&mut tx, first.request_id, RequestStatus::Rejected).await?);
    User::set_role(&mut tx, 42, Role::Unregistered).await?;
    tx.commit().await?;

    assert!(matches!(
        begin(&env.db().pool, 42).await?,
        BeginOutcome::Started(RegistrationState::ChoosingTutor)
    ));

    let second = complete(
        &env.db().pool,
        env.notifications(),
        &identity(42),
        form(501, &["Anna K", "16", "MSK+1", "Physics"]),
    )
    .await?;

    let user = User::find_by_id(&env.db().pool, 42).await?.unwrap();
    assert_eq!(user.role(), Role::Student);
    assert_eq!(user.tutor_id, Some(501));
    assert_eq!(request_count(&env.db().pool, 42).await?, 2);
    assert_ne!(first.request_id, second.request_id);
    assert_eq!(StudentRequest::pending_for_tutor(&env.db().pool, 501).await?.len(), 1);
    assert!(StudentRequest::pending_for_tutor(&env.db().pool, TUTOR_ID).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_notification_keeps_registration() -> Result<()> {
    let env = setup_env_with(RecordingNotifier::failing(), Vec::new()).await?;
    seed_tutor(env.db(), TUTOR_ID, "Maria").await?;

    let registered = complete(
        &env.db().pool,
        env.notifications(),
        &identity(42),
        form(TUTOR_ID, &["Anna", "15", "MSK", "Math"]),
    )
    .await?;

    assert!(!registered.notified);
    assert!(User::find_by_id(&env.db().pool, 42).await?.is_some());
    assert_eq!(request_count(&env.db().pool, 42).await?, 1);
    assert_eq!(env.notifier.sent().len(), 1);
    Ok(())
}
