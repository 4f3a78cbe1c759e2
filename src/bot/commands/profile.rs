use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html::escape;

use super::callback_chat;
use crate::bot::callback_data::CallbackAction;
use crate::bot::context::AppContext;
use crate::bot::dialogue::{BotDialogue, State};
use crate::bot::handlers::HandlerResult;
use crate::bot::keyboards::{cancel_keyboard, main_menu};
use crate::database::models::{Group, Tutor, TutorField, TutorUpdate, User};
use crate::services::roles::Role;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_success, log_validation_error};
use crate::utils::validation::{optional_field, validate_cost, validate_name, validate_text, ValidationError};

/// Validates a new value for one profile field.
pub fn parse_profile_value(field: TutorField, input: &str) -> Result<TutorUpdate, ValidationError> {
    Ok(match field {
        TutorField::Name => TutorUpdate::Name(validate_name(input)?),
        TutorField::Subjects => TutorUpdate::Subjects(validate_text(input, 200)?),
        TutorField::Cost => TutorUpdate::Cost(validate_cost(input)?),
        TutorField::Link => TutorUpdate::Link(optional_field(input)),
    })
}

fn field_label(field: TutorField) -> &'static str {
    match field {
        TutorField::Name => "✍️ Name",
        TutorField::Subjects => "📚 Subjects",
        TutorField::Cost => "💰 Price",
        TutorField::Link => "🌐 Link",
    }
}

fn field_prompt(field: TutorField) -> &'static str {
    match field {
        TutorField::Name => "Send your new display name:",
        TutorField::Subjects => "Send your subjects, comma separated:",
        TutorField::Cost => "Send the lesson price (a whole number):",
        TutorField::Link => "Send the lesson link, or \"no\" to remove it:",
    }
}

pub async fn show_profile(bot: &Bot, chat_id: ChatId, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let Some(tutor) = Tutor::find_by_id(&ctx.db.pool, tutor_id).await? else {
        CommandFeedback::new(bot.clone(), chat_id)
            .warning("You don't have a tutor profile yet. Ask a superadmin to create one.")
            .await?;
        return Ok(());
    };

    let text = format!(
        "👤 <b>Your profile</b>\n\n\
         ✍️ Name: {}\n\
         📚 Subjects: {}\n\
         💰 Price: {}\n\
         🌐 Link: {}",
        escape(&tutor.name),
        escape(tutor.subjects.as_deref().unwrap_or("-")),
        tutor.cost,
        escape(tutor.link.as_deref().unwrap_or("-")),
    );
    let fields = [TutorField::Name, TutorField::Subjects, TutorField::Cost, TutorField::Link];
    let keyboard = InlineKeyboardMarkup::new(fields.chunks(2).map(|row| {
        row.iter()
            .map(|f| InlineKeyboardButton::callback(field_label(*f), CallbackAction::EditProfile(*f).encode()))
            .collect::<Vec<_>>()
    }));

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

pub async fn start_edit(bot: &Bot, q: &CallbackQuery, dialogue: &BotDialogue, field: TutorField) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    bot.send_message(callback_chat(q), field_prompt(field))
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::EditProfile { field }).await?;
    Ok(())
}

pub async fn receive_edit(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    field: TutorField,
    tutor: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let input = msg.text().unwrap_or_default();
    let update = match parse_profile_value(field, input) {
        Ok(update) => update,
        Err(e) => {
            log_validation_error(field.as_str(), input, &e.to_string(), tutor.id);
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .validation_error(&e.to_string(), field_prompt(field))
                .await?;
            return Ok(());
        }
    };

    let updated = Tutor::update(&ctx.db.pool, tutor.id, &update).await?;
    dialogue.exit().await?;
    let menu = main_menu(ctx.menu_role(tutor.id, Some(tutor)));

    if !updated {
        bot.send_message(msg.chat.id, "⚠️ You don't have a tutor profile yet.")
            .reply_markup(menu)
            .await?;
        return Ok(());
    }

    log_command_success("edit_profile", &tutor.display_name(), tutor.id, Some(field.as_str()));
    bot.send_message(msg.chat.id, "✅ Profile updated.")
        .reply_markup(menu)
        .await?;
    show_profile(bot, msg.chat.id, tutor.id, ctx).await
}

/// Students of the tutor, archived ones marked, followed by their groups.
pub async fn my_students(bot: &Bot, chat_id: ChatId, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let students = User::students_of_tutor(&ctx.db.pool, tutor_id, true).await?;
    let groups = Group::for_tutor(&ctx.db.pool, tutor_id).await?;

    let mut text = String::from("👥 <b>Your students</b>\n");
    if students.is_empty() {
        text.push_str("\nNo students yet.");
    }
    for student in &students {
        let archived = if student.role() == Role::Archived {
            " 🗄"
        } else {
            ""
        };
        text.push_str(&format!("\n• {}{}", escape(&student.display_name()), archived));
        if let Some(subject) = &student.subject {
            text.push_str(&format!(" · {}", escape(subject)));
        }
        if let Some(timezone) = &student.timezone {
            text.push_str(&format!(" · {}", escape(timezone)));
        }
        if let Some(username) = &student.username {
            text.push_str(&format!(" · @{}", escape(username)));
        }
    }

    if !groups.is_empty() {
        text.push_str("\n\n👪 <b>Groups</b>\n");
        for group in &groups {
            let members = Group::members(&ctx.db.pool, group.id).await?;
            let names: Vec<String> = members.iter().map(|m| escape(&m.display_name())).collect();
            text.push_str(&format!(
                "\n• {} ({}): {}",
                escape(&group.name),
                members.len(),
                if names.is_empty() { "-".to_string() } else { names.join(", ") }
            ));
        }
    }

    bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_values_are_validated_per_field() {
        assert_eq!(
            parse_profile_value(TutorField::Cost, " 1500 "),
            Ok(TutorUpdate::Cost(1500))
        );
        assert_eq!(
            parse_profile_value(TutorField::Cost, "cheap"),
            Err(ValidationError::InvalidCost)
        );
        assert_eq!(
            parse_profile_value(TutorField::Link, "no"),
            Ok(TutorUpdate::Link(None))
        );
        assert_eq!(
            parse_profile_value(TutorField::Name, "A"),
            Err(ValidationError::NameTooShort)
        );
        assert_eq!(
            parse_profile_value(TutorField::Subjects, "Math, Physics"),
            Ok(TutorUpdate::Subjects("Math, Physics".to_string()))
        );
    }
}
