use teloxide::prelude::*;

use super::HandlerResult;
use crate::bot::context::AppContext;
use crate::services::roles::Role;
use crate::utils::feedback::CommandFeedback;

/// Text that is neither a command, a menu button nor an awaited answer.
pub async fn handle_general_message(bot: &Bot, msg: &Message, ctx: &AppContext) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text.starts_with('/') {
        let command = text.split_whitespace().next().unwrap_or(text);
        feedback
            .validation_error(
                &format!("Unknown command: {command}"),
                "Use /help to see all available commands.",
            )
            .await?;
        return Ok(());
    }

    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or_default();
    let user = ctx.load_user(user_id).await?;
    match ctx.menu_role(user_id, user.as_ref()) {
        Role::Unregistered => {
            feedback.info("Press /start to register with a tutor.").await?;
        }
        Role::Archived => {
            feedback.info("Your account is archived. Please contact the administrator.").await?;
        }
        _ => {
            feedback.info("Use the menu buttons below, or /help.").await?;
        }
    }
    Ok(())
}
