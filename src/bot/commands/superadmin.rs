use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html::escape;

use super::callback_chat;
use crate::bot::callback_data::CallbackAction;
use crate::bot::context::AppContext;
use crate::bot::dialogue::{AddTutorOutcome, AddTutorStep, BotDialogue, State};
use crate::bot::handlers::HandlerResult;
use crate::bot::keyboards::{cancel_button, cancel_keyboard, main_menu, role_choice};
use crate::database::models::{NewTutor, Tutor, User, DEFAULT_LESSON_COST};
use crate::services::roles::Role;
use crate::utils::feedback::{CommandFeedback, FeedbackType};
use crate::utils::logging::{log_command_success, log_validation_error};
use crate::utils::validation::validate_user_id;

pub async fn start_add_tutor(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    let step = AddTutorStep::UserId;
    bot.send_message(chat_id, step.prompt())
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::AddTutor(step)).await?;
    Ok(())
}

pub async fn receive_add_tutor(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    step: AddTutorStep,
    admin: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let input = msg.text().unwrap_or_default();

    let new_tutor = match step.advance(input) {
        AddTutorOutcome::Next(next) => {
            bot.send_message(msg.chat.id, next.prompt()).await?;
            dialogue.update(State::AddTutor(next)).await?;
            return Ok(());
        }
        AddTutorOutcome::Retry(e) => {
            log_validation_error("add_tutor", input, &e.to_string(), admin.id);
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .validation_error(&e.to_string(), step.prompt())
                .await?;
            return Ok(());
        }
        AddTutorOutcome::Complete(new_tutor) => new_tutor,
    };
    dialogue.exit().await?;

    let tutor = create_tutor(ctx, &new_tutor).await?;
    ctx.notifications.role_changed(tutor.id, Role::Admin).await;
    log_command_success(
        "add_tutor",
        &admin.display_name(),
        admin.id,
        Some(&format!("tutor {} ({})", tutor.name, tutor.id)),
    );

    bot.send_message(
        msg.chat.id,
        format!(
            "✅ Tutor <b>{}</b> added.\n📚 {}\n💰 {}",
            escape(&tutor.name),
            escape(tutor.subjects.as_deref().unwrap_or("-")),
            tutor.cost
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(main_menu(ctx.menu_role(admin.id, Some(admin))))
    .await?;
    Ok(())
}

/// User row with the admin role plus the tutor profile, in one transaction.
/// Existing superadmins keep their role.
pub async fn create_tutor(ctx: &AppContext, new_tutor: &NewTutor) -> Result<Tutor, sqlx::Error> {
    let existing = User::find_by_id(&ctx.db.pool, new_tutor.id).await?;
    let role = match existing.as_ref().map(User::role) {
        Some(Role::Superadmin) => Role::Superadmin,
        _ => Role::Admin,
    };

    let mut tx = ctx.db.pool.begin().await?;
    User::upsert_with_role(
        &mut *tx,
        new_tutor.id,
        new_tutor.username.as_deref(),
        &new_tutor.name,
        role,
    )
    .await?;
    let tutor = Tutor::upsert(&mut *tx, new_tutor).await?;
    tx.commit().await?;
    Ok(tutor)
}

/// Removes the profile and archives the account. Lessons and homework stay.
pub async fn remove_tutor(ctx: &AppContext, tutor_id: i64) -> Result<bool, sqlx::Error> {
    let mut tx = ctx.db.pool.begin().await?;
    let deleted = Tutor::delete(&mut tx, tutor_id).await?;
    if deleted {
        User::set_role(&mut tx, tutor_id, Role::Archived).await?;
    }
    tx.commit().await?;
    Ok(deleted)
}

pub async fn choose_tutor_to_remove(bot: &Bot, chat_id: ChatId, ctx: &AppContext) -> HandlerResult {
    let tutors = Tutor::list_all(&ctx.db.pool).await?;
    if tutors.is_empty() {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("There are no tutors.")
            .await?;
        return Ok(());
    }

    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = tutors
        .iter()
        .map(|t| {
            vec![InlineKeyboardButton::callback(
                format!("🗑 {}", t.name),
                CallbackAction::DeleteTutor(t.id).encode(),
            )]
        })
        .collect();
    keyboard.push(vec![cancel_button()]);

    bot.send_message(chat_id, "Which tutor should be removed?")
        .reply_markup(InlineKeyboardMarkup::new(keyboard))
        .await?;
    Ok(())
}

pub async fn confirm_remove(bot: &Bot, q: &CallbackQuery, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let Some(tutor) = Tutor::find_by_id(&ctx.db.pool, tutor_id).await? else {
        bot.answer_callback_query(q.id.clone()).text("Tutor not found.").await?;
        return Ok(());
    };
    bot.answer_callback_query(q.id.clone()).await?;

    bot.send_message(
        callback_chat(q),
        format!(
            "⚠️ Remove <b>{}</b>? The profile is deleted and the account archived.",
            escape(&tutor.name)
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Remove", CallbackAction::ConfirmDeleteTutor(tutor.id).encode()),
        cancel_button(),
    ]]))
    .await?;
    Ok(())
}

pub async fn execute_remove(bot: &Bot, q: &CallbackQuery, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let admin_id = q.from.id.0 as i64;
    if !remove_tutor(ctx, tutor_id).await? {
        bot.answer_callback_query(q.id.clone()).text("Tutor not found.").await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;
    ctx.notifications.role_changed(tutor_id, Role::Archived).await;
    log_command_success("remove_tutor", &admin_id.to_string(), admin_id, Some(&tutor_id.to_string()));

    if let Some(message) = &q.message {
        CommandFeedback::new(bot.clone(), message.chat.id)
            .update_message(message.id, FeedbackType::Success, "Tutor removed and archived.")
            .await?;
    }
    Ok(())
}

pub async fn start_change_role(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    bot.send_message(chat_id, "🆔 Send the Telegram user id whose role should change:")
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::ChangeRoleUser).await?;
    Ok(())
}

pub async fn receive_role_user(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    admin_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let input = msg.text().unwrap_or_default();

    let user_id = match validate_user_id(input) {
        Ok(id) => id,
        Err(e) => {
            log_validation_error("change_role", input, &e.to_string(), admin_id);
            feedback.validation_error(&e.to_string(), "Example: 123456789").await?;
            return Ok(());
        }
    };

    if ctx.roles.is_configured_superadmin(user_id) {
        feedback
            .warning("This user is a superadmin by configuration; the role cannot be changed here.")
            .await?;
        return Ok(());
    }

    let Some(user) = User::find_by_id(&ctx.db.pool, user_id).await? else {
        feedback
            .validation_error("No user with this id has used the bot.", "Ask them to press /start first.")
            .await?;
        return Ok(());
    };

    bot.send_message(
        msg.chat.id,
        format!(
            "👤 <b>{}</b>\nCurrent role: {}\n\nChoose the new role:",
            escape(&user.display_name()),
            user.role().label()
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(role_choice())
    .await?;
    dialogue.update(State::ChangeRoleSelect { user_id }).await?;
    Ok(())
}

/// Applies a role. Promoting to a tutor role creates a default profile when
/// the user has none, so they appear in the tutor list.
pub async fn apply_role(ctx: &AppContext, user_id: i64, role: Role) -> Result<bool, sqlx::Error> {
    let Some(user) = User::find_by_id(&ctx.db.pool, user_id).await? else {
        return Ok(false);
    };

    let mut tx = ctx.db.pool.begin().await?;
    User::set_role(&mut tx, user_id, role).await?;
    if role.is_tutor() {
        let has_profile: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tutors WHERE id = ?")
            .bind(user_id)
            .fetch_one(&mut tx)
            .await?;
        if has_profile == 0 {
            Tutor::upsert(
                &mut *tx,
                &NewTutor {
                    id: user_id,
                    name: user.display_name(),
                    username: user.username.clone(),
                    subjects: "All subjects".to_string(),
                    cost: DEFAULT_LESSON_COST,
                    link: None,
                },
            )
            .await?;
        }
    }
    tx.commit().await?;
    Ok(true)
}

pub async fn choose_role(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    user_id: i64,
    role: Role,
    ctx: &AppContext,
) -> HandlerResult {
    let admin_id = q.from.id.0 as i64;
    dialogue.exit().await?;

    if !apply_role(ctx, user_id, role).await? {
        bot.answer_callback_query(q.id.clone()).text("User not found.").await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;
    ctx.notifications.role_changed(user_id, role).await;
    log_command_success(
        "change_role",
        &admin_id.to_string(),
        admin_id,
        Some(&format!("{user_id} -> {role}")),
    );

    if let Some(message) = &q.message {
        CommandFeedback::new(bot.clone(), message.chat.id)
            .update_message(
                message.id,
                FeedbackType::Success,
                &format!("Role of {} changed to {}.", user_id, role.label()),
            )
            .await?;
    }
    let admin = ctx.load_user(admin_id).await?;
    bot.send_message(callback_chat(q), "🏠 Main menu")
        .reply_markup(main_menu(ctx.menu_role(admin_id, admin.as_ref())))
        .await?;
    Ok(())
}

pub async fn tutor_list(bot: &Bot, chat_id: ChatId, ctx: &AppContext) -> HandlerResult {
    let tutors = Tutor::list_all(&ctx.db.pool).await?;

    let mut text = String::from("📋 <b>Tutors</b>\n");
    if tutors.is_empty() {
        text.push_str("\nNo tutors yet.");
    }
    for tutor in &tutors {
        let students = User::students_of_tutor(&ctx.db.pool, tutor.id, false).await?.len();
        text.push_str(&format!(
            "\n• <b>{}</b> (id {}){}\n  📚 {} · 💰 {} · 👥 {}",
            escape(&tutor.name),
            tutor.id,
            tutor
                .username
                .as_deref()
                .map(|u| format!(" @{}", escape(u)))
                .unwrap_or_default(),
            escape(tutor.subjects.as_deref().unwrap_or("-")),
            tutor.cost,
            students
        ));
    }

    bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}
