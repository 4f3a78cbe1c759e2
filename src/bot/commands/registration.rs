use teloxide::prelude::*;
use teloxide::types::{KeyboardRemove, ParseMode};
use teloxide::utils::html::escape;

use crate::bot::context::AppContext;
use crate::bot::dialogue::{BotDialogue, State};
use crate::bot::handlers::HandlerResult;
use crate::bot::keyboards::cancel_keyboard;
use crate::database::models::Tutor;
use crate::services::registration::{
    self, RegistrationError, RegistrationState, StudentIdentity, Step,
};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_success, log_database_error, log_validation_error};

/// Tutor button pressed during registration.
pub async fn choose_tutor(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    state: &RegistrationState,
    tutor_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };

    let Some(next) = state.select_tutor(tutor_id) else {
        bot.answer_callback_query(q.id.clone())
            .text("The tutor is already chosen.")
            .await?;
        return Ok(());
    };

    let Some(tutor) = Tutor::find_by_id(&ctx.db.pool, tutor_id).await? else {
        bot.answer_callback_query(q.id.clone())
            .text("This tutor is no longer available.")
            .await?;
        return Ok(());
    };

    bot.answer_callback_query(q.id.clone()).await?;
    bot.edit_message_text(
        message.chat.id,
        message.id,
        format!("👨‍🏫 Tutor: <b>{}</b>", escape(&tutor.name)),
    )
    .parse_mode(ParseMode::Html)
    .await?;

    bot.send_message(message.chat.id, next.prompt())
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::Registration(next)).await?;
    Ok(())
}

/// One text message while registering.
pub async fn handle_input(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    state: RegistrationState,
    ctx: &AppContext,
) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let Some(text) = msg.text() else {
        feedback
            .validation_error("Please answer with a text message.", state.prompt())
            .await?;
        return Ok(());
    };

    match state.advance(text) {
        Step::Next(next) => {
            bot.send_message(msg.chat.id, next.prompt())
                .reply_markup(cancel_keyboard())
                .await?;
            dialogue.update(State::Registration(next)).await?;
        }
        Step::Retry(error) => {
            log_validation_error(state.step_name(), text, &error.to_string(), user_id);
            feedback
                .validation_error(&error.to_string(), state.prompt())
                .await?;
        }
        Step::Complete(form) => {
            // Collected fields are discarded whatever the outcome.
            dialogue.exit().await?;

            let identity = StudentIdentity {
                id: user_id,
                username: from.username.clone(),
            };
            match registration::complete(&ctx.db.pool, &ctx.notifications, &identity, form).await {
                Ok(registered) => {
                    log_command_success(
                        "registration",
                        &registered.user.display_name(),
                        user_id,
                        Some(&format!("request {}", registered.request_id)),
                    );
                    bot.send_message(
                        msg.chat.id,
                        "✅ <b>Registration complete!</b>\n\n\
                         Your request has been sent to the tutor. \
                         You will get a message as soon as they respond.",
                    )
                    .parse_mode(ParseMode::Html)
                    .reply_markup(KeyboardRemove::new())
                    .await?;
                }
                Err(RegistrationError::AlreadyRegistered(_)) => {
                    feedback.info("You are already registered. Press /start to open your menu.").await?;
                }
                Err(RegistrationError::TutorNotFound(_)) => {
                    feedback
                        .warning("This tutor is no longer available. Press /start to choose another one.")
                        .await?;
                }
                Err(RegistrationError::Storage(e)) => {
                    log_database_error("register", "users", &e.to_string(), Some(&user_id.to_string()));
                    feedback.internal_error().await?;
                }
            }
        }
    }
    Ok(())
}
