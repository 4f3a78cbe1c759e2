pub mod availability;
pub mod homework;
pub mod lessons;
pub mod profile;
pub mod registration;
pub mod requests;
pub mod start;
pub mod stats;
pub mod student;
pub mod superadmin;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot::context::AppContext;
use crate::database::models::User;
use crate::services::roles::Role;

/// Chat an inline button was pressed in. Private chats share the user's id.
pub(crate) fn callback_chat(q: &CallbackQuery) -> ChatId {
    q.message
        .as_ref()
        .map(|m| m.chat.id)
        .unwrap_or(ChatId(q.from.id.0 as i64))
}

/// Active students of a tutor, the ones flows may pick from.
pub(crate) async fn active_students(ctx: &AppContext, tutor_id: i64) -> Result<Vec<User>, sqlx::Error> {
    let students = User::students_of_tutor(&ctx.db.pool, tutor_id, false).await?;
    Ok(students
        .into_iter()
        .filter(|s| s.role() == Role::Student)
        .collect())
}

/// The student if they belong to the tutor.
pub(crate) async fn own_student(
    ctx: &AppContext,
    tutor_id: i64,
    student_id: i64,
) -> Result<Option<User>, sqlx::Error> {
    Ok(active_students(ctx, tutor_id)
        .await?
        .into_iter()
        .find(|s| s.id == student_id))
}

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Tutor bot commands:")]
pub enum Command {
    #[command(description = "Start the bot or register with a tutor")]
    Start,
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Show the main menu")]
    Menu,
    #[command(description = "Cancel the current action")]
    Cancel,
    #[command(description = "Switch to the tutor menu")]
    Admin,
    #[command(description = "Switch to the superadmin menu")]
    Superadmin,
    #[command(description = "Switch to the student menu")]
    Student,
}
