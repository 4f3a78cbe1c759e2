use teloxide::dispatching::dialogue::{Dialogue, InMemStorage, InMemStorageError};

use crate::bot::keyboards::MenuButton;
use crate::database::models::{ContentType, NewTutor, TutorField, DEFAULT_LESSON_COST};
use crate::services::registration::RegistrationState;
use crate::utils::validation::{
    optional_field, validate_cost, validate_name, validate_text, validate_user_id, ValidationError,
};

pub type BotDialogue = Dialogue<State, InMemStorage<State>>;

/// Per-chat position in a multi-step flow. `Idle` means menu buttons and
/// commands are interpreted normally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,
    Registration(RegistrationState),

    AssignHomeworkStudent,
    AssignHomeworkType {
        student_id: i64,
    },
    AssignHomeworkContent {
        student_id: i64,
        content_type: ContentType,
    },
    HomeworkReminder {
        homework_id: i64,
    },
    SubmitHomeworkType {
        homework_id: i64,
    },
    SubmitHomeworkContent {
        homework_id: i64,
        content_type: ContentType,
    },

    AddLessonStudent,
    AddLessonDateTime {
        student_id: i64,
    },
    RescheduleLesson {
        lesson_id: i64,
    },
    AddTemplateStudent,
    AddTemplateTime {
        student_id: i64,
    },

    AddSlot,
    AddVacationStart,
    AddVacationEnd {
        start: String,
    },
    AddVacationReason {
        start: String,
        end: String,
    },

    EditProfile {
        field: TutorField,
    },
    MessageTutor {
        tutor_id: i64,
    },

    ChangeRoleUser,
    ChangeRoleSelect {
        user_id: i64,
    },
    AddTutor(AddTutorStep),
}

impl State {
    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }
}

/// True for the reply-keyboard cancel button. It is checked before any
/// awaited answer, so "❌ Cancel" never ends up stored as a name or subject.
pub fn is_cancel_text(text: &str) -> bool {
    MenuButton::from_text(text) == Some(MenuButton::Cancel)
}

/// Discards whatever the current flow collected. Returns `false` when the
/// chat was already idle.
pub async fn reset(dialogue: &BotDialogue) -> Result<bool, InMemStorageError> {
    let was_active = dialogue.get().await?.is_some_and(|state| !state.is_idle());
    dialogue.exit().await?;
    Ok(was_active)
}

/// Superadmin flow for creating a tutor profile:
/// user id, name, username, subjects, price, lesson link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTutorStep {
    UserId,
    Name {
        id: i64,
    },
    Username {
        id: i64,
        name: String,
    },
    Subjects {
        id: i64,
        name: String,
        username: Option<String>,
    },
    Cost {
        id: i64,
        name: String,
        username: Option<String>,
        subjects: String,
    },
    Link {
        id: i64,
        name: String,
        username: Option<String>,
        subjects: String,
        cost: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTutorOutcome {
    Next(AddTutorStep),
    Retry(ValidationError),
    Complete(NewTutor),
}

impl AddTutorStep {
    pub fn advance(&self, input: &str) -> AddTutorOutcome {
        use AddTutorOutcome::{Complete, Next, Retry};

        match self {
            AddTutorStep::UserId => match validate_user_id(input) {
                Ok(id) => Next(AddTutorStep::Name { id }),
                Err(e) => Retry(e),
            },
            AddTutorStep::Name { id } => match validate_name(input) {
                Ok(name) => Next(AddTutorStep::Username { id: *id, name }),
                Err(e) => Retry(e),
            },
            AddTutorStep::Username { id, name } => Next(AddTutorStep::Subjects {
                id: *id,
                name: name.clone(),
                username: optional_field(input).map(|u| u.trim_start_matches('@').to_string()),
            }),
            AddTutorStep::Subjects { id, name, username } => match validate_text(input, 200) {
                Ok(subjects) => Next(AddTutorStep::Cost {
                    id: *id,
                    name: name.clone(),
                    username: username.clone(),
                    subjects,
                }),
                Err(e) => Retry(e),
            },
            AddTutorStep::Cost {
                id,
                name,
                username,
                subjects,
            } => {
                let cost = if input.trim().is_empty() {
                    Ok(DEFAULT_LESSON_COST)
                } else {
                    validate_cost(input)
                };
                match cost {
                    Ok(cost) => Next(AddTutorStep::Link {
                        id: *id,
                        name: name.clone(),
                        username: username.clone(),
                        subjects: subjects.clone(),
                        cost,
                    }),
                    Err(e) => Retry(e),
                }
            }
            AddTutorStep::Link {
                id,
                name,
                username,
                subjects,
                cost,
            } => Complete(NewTutor {
                id: *id,
                name: name.clone(),
                username: username.clone(),
                subjects: subjects.clone(),
                cost: *cost,
                link: optional_field(input),
            }),
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            AddTutorStep::UserId => "🆔 Send the new tutor's Telegram user id:",
            AddTutorStep::Name { .. } => "✍️ Tutor's full name:",
            AddTutorStep::Username { .. } => "🔗 Telegram username (or \"no\"):",
            AddTutorStep::Subjects { .. } => "📚 Subjects, comma separated:",
            AddTutorStep::Cost { .. } => "💰 Lesson price:",
            AddTutorStep::Link { .. } => "🌐 Lesson link (or \"no\"):",
        }
    }
}
