//! Student registration: tutor choice, then name, age, timezone and subject,
//! one field per message, ending in a single insert and one notification.
//!
//! The state machine itself ([`RegistrationState::advance`]) is pure so it can
//! be driven from tests without a bot. Only [`complete`] touches storage.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use crate::database::models::{NewStudent, StudentRequest, Tutor, User};
use crate::services::notifications::NotificationService;
use crate::services::roles::Role;
use crate::utils::validation::{
    validate_age, validate_name, validate_subject, validate_timezone, ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    ChoosingTutor,
    AwaitingName {
        tutor_id: i64,
    },
    AwaitingAge {
        tutor_id: i64,
        name: String,
    },
    AwaitingTimezone {
        tutor_id: i64,
        name: String,
        age: i64,
    },
    AwaitingSubject {
        tutor_id: i64,
        name: String,
        age: i64,
        timezone: String,
    },
}

/// Everything collected once the last field is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub tutor_id: i64,
    pub name: String,
    pub age: i64,
    pub timezone: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Input accepted, ask for the next field.
    Next(RegistrationState),
    /// Input refused, stay in the same state.
    Retry(ValidationError),
    /// Last field accepted.
    Complete(RegistrationForm),
}

impl RegistrationState {
    /// Tutor buttons only work while the tutor is being chosen.
    pub fn select_tutor(&self, tutor_id: i64) -> Option<RegistrationState> {
        match self {
            RegistrationState::ChoosingTutor => Some(RegistrationState::AwaitingName { tutor_id }),
            _ => None,
        }
    }

    pub fn advance(&self, input: &str) -> Step {
        match self {
            RegistrationState::ChoosingTutor => Step::Retry(ValidationError::TutorNotChosen),
            RegistrationState::AwaitingName { tutor_id } => match validate_name(input) {
                Ok(name) => Step::Next(RegistrationState::AwaitingAge {
                    tutor_id: *tutor_id,
                    name,
                }),
                Err(e) => Step::Retry(e),
            },
            RegistrationState::AwaitingAge { tutor_id, name } => match validate_age(input) {
                Ok(age) => Step::Next(RegistrationState::AwaitingTimezone {
                    tutor_id: *tutor_id,
                    name: name.clone(),
                    age,
                }),
                Err(e) => Step::Retry(e),
            },
            RegistrationState::AwaitingTimezone { tutor_id, name, age } => {
                match validate_timezone(input) {
                    Ok(timezone) => Step::Next(RegistrationState::AwaitingSubject {
                        tutor_id: *tutor_id,
                        name: name.clone(),
                        age: *age,
                        timezone,
                    }),
                    Err(e) => Step::Retry(e),
                }
            }
            RegistrationState::AwaitingSubject {
                tutor_id,
                name,
                age,
                timezone,
            } => match validate_subject(input) {
                Ok(subject) => Step::Complete(RegistrationForm {
                    tutor_id: *tutor_id,
                    name: name.clone(),
                    age: *age,
                    timezone: timezone.clone(),
                    subject,
                }),
                Err(e) => Step::Retry(e),
            },
        }
    }

    /// Question asked while in this state.
    pub fn prompt(&self) -> &'static str {
        match self {
            RegistrationState::ChoosingTutor => "👨‍🏫 Choose your tutor:",
            RegistrationState::AwaitingName { .. } => "✍️ Enter your full name:",
            RegistrationState::AwaitingAge { .. } => "🎂 How old are you?",
            RegistrationState::AwaitingTimezone { .. } => {
                "🌍 Enter your timezone relative to Moscow, for example MSK, MSK+2 or MSK-1:"
            }
            RegistrationState::AwaitingSubject { .. } => "📚 Which subject do you want to study?",
        }
    }

    pub fn step_name(&self) -> &'static str {
        match self {
            RegistrationState::ChoosingTutor => "choosing_tutor",
            RegistrationState::AwaitingName { .. } => "awaiting_name",
            RegistrationState::AwaitingAge { .. } => "awaiting_age",
            RegistrationState::AwaitingTimezone { .. } => "awaiting_timezone",
            RegistrationState::AwaitingSubject { .. } => "awaiting_subject",
        }
    }
}

#[derive(Debug)]
pub enum BeginOutcome {
    AlreadyRegistered(User),
    Started(RegistrationState),
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("tutor {0} does not exist")]
    TutorNotFound(i64),
    #[error("user {0} is already registered")]
    AlreadyRegistered(i64),
}

/// Who is registering, as reported by Telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentIdentity {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug)]
pub struct Registered {
    pub user: User,
    pub request_id: i64,
    /// Whether the tutor notification went out.
    pub notified: bool,
}

fn is_registered(user: &User) -> bool {
    user.role() != Role::Unregistered
}

/// Start the dialogue, or short-circuit for users who already have a role.
pub async fn begin(pool: &SqlitePool, user_id: i64) -> Result<BeginOutcome, sqlx::Error> {
    match User::find_by_id(pool, user_id).await? {
        Some(user) if is_registered(&user) => Ok(BeginOutcome::AlreadyRegistered(user)),
        _ => Ok(BeginOutcome::Started(RegistrationState::ChoosingTutor)),
    }
}

/// Persist the student and their request, then notify the tutor once.
///
/// Both rows are written in one transaction. A failed notification is logged
/// but does not undo the registration.
pub async fn complete(
    pool: &SqlitePool,
    notifications: &NotificationService,
    identity: &StudentIdentity,
    form: RegistrationForm,
) -> Result<Registered, RegistrationError> {
    if Tutor::find_by_id(pool, form.tutor_id).await?.is_none() {
        return Err(RegistrationError::TutorNotFound(form.tutor_id));
    }
    if let Some(existing) = User::find_by_id(pool, identity.id).await? {
        if is_registered(&existing) {
            return Err(RegistrationError::AlreadyRegistered(identity.id));
        }
    }

    let student = NewStudent {
        id: identity.id,
        username: identity.username.clone(),
        name: form.name,
        tutor_id: form.tutor_id,
        timezone: form.timezone,
        subject: form.subject,
        age: form.age,
    };

    let mut tx = pool.begin().await?;
    let user = User::upsert_student(&mut *tx, &student).await?;
    let request = StudentRequest::create(&mut *tx, user.id, form.tutor_id).await?;
    tx.commit().await?;

    info!(
        "Registered student {} with tutor {} (request {})",
        user.id, form.tutor_id, request.id
    );

    let notified = notifications
        .new_request(form.tutor_id, &user, request.id)
        .await;
    if !notified {
        warn!("Tutor {} was not notified about request {}", form.tutor_id, request.id);
    }

    Ok(Registered {
        user,
        request_id: request.id,
        notified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject_state() -> RegistrationState {
        RegistrationState::AwaitingSubject {
            tutor_id: 1,
            name: "Anna".to_string(),
            age: 15,
            timezone: "MSK+2".to_string(),
        }
    }

    #[test]
    fn tutor_choice_only_from_first_state() {
        assert_eq!(
            RegistrationState::ChoosingTutor.select_tutor(9),
            Some(RegistrationState::AwaitingName { tutor_id: 9 })
        );
        assert_eq!(subject_state().select_tutor(9), None);
    }

    #[test]
    fn text_while_choosing_tutor_is_refused() {
        assert_eq!(
            RegistrationState::ChoosingTutor.advance("hello"),
            Step::Retry(ValidationError::TutorNotChosen)
        );
    }

    #[test]
    fn subject_completes_the_form() {
        match subject_state().advance(" Math ") {
            Step::Complete(form) => {
                assert_eq!(form.subject, "Math");
                assert_eq!(form.timezone, "MSK+2");
                assert_eq!(form.age, 15);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn every_state_has_a_prompt() {
        for state in [
            RegistrationState::ChoosingTutor,
            RegistrationState::AwaitingName { tutor_id: 1 },
            subject_state(),
        ] {
            assert!(!state.prompt().is_empty());
        }
    }
}
