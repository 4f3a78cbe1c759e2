use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html::escape;

use super::callback_chat;
use crate::bot::callback_data::CallbackAction;
use crate::bot::context::AppContext;
use crate::bot::dialogue::{BotDialogue, State};
use crate::bot::handlers::HandlerResult;
use crate::bot::keyboards::{cancel_keyboard, main_menu};
use crate::database::models::{AvailableSlot, User, VacationPeriod};
use crate::utils::datetime::{format_date, format_lesson_time, DATE_FORMAT, TIME_FORMAT};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_success, log_validation_error};
use crate::utils::validation::{optional_field, parse_date, parse_future_date_time, ValidationError};

pub async fn list_slots(bot: &Bot, chat_id: ChatId, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let slots = AvailableSlot::open_for_tutor(&ctx.db.pool, tutor_id, &ctx.today()).await?;

    let mut text = String::from("🕒 <b>Free slots</b>\n");
    let mut keyboard = Vec::new();
    if slots.is_empty() {
        text.push_str("\nNo free slots.");
    }
    for slot in &slots {
        let when = format_lesson_time(&slot.slot_date, &slot.slot_time);
        text.push_str(&format!("\n• {when}"));
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!("🗑 {when}"),
            CallbackAction::DeleteSlot(slot.id).encode(),
        )]);
    }
    keyboard.push(vec![InlineKeyboardButton::callback(
        "➕ Add slot",
        CallbackAction::AddSlot.encode(),
    )]);

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(keyboard))
        .await?;
    Ok(())
}

pub async fn start_add_slot(bot: &Bot, q: &CallbackQuery, dialogue: &BotDialogue) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    bot.send_message(callback_chat(q), "🕒 Send the free slot: YYYY-MM-DD HH:MM")
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::AddSlot).await?;
    Ok(())
}

pub async fn receive_slot(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    tutor: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let input = msg.text().unwrap_or_default();
    let at = match parse_future_date_time(input, ctx.now()) {
        Ok(at) => at,
        Err(e) => {
            log_validation_error("add_slot", input, &e.to_string(), tutor.id);
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .validation_error(&e.to_string(), "Example: 2024-03-15 16:00")
                .await?;
            return Ok(());
        }
    };

    let date = at.format(DATE_FORMAT).to_string();
    let time = at.format(TIME_FORMAT).to_string();
    AvailableSlot::create(&ctx.db.pool, tutor.id, &date, &time).await?;
    dialogue.exit().await?;

    bot.send_message(
        msg.chat.id,
        format!("✅ Free slot added: {}.", format_lesson_time(&date, &time)),
    )
    .reply_markup(main_menu(ctx.menu_role(tutor.id, Some(tutor))))
    .await?;
    Ok(())
}

pub async fn delete_slot(bot: &Bot, q: &CallbackQuery, slot_id: i64, ctx: &AppContext) -> HandlerResult {
    let tutor_id = q.from.id.0 as i64;
    let deleted = AvailableSlot::delete(&ctx.db.pool, slot_id, tutor_id).await?;
    let text = if deleted { "Slot removed." } else { "Slot not found." };
    bot.answer_callback_query(q.id.clone()).text(text).await?;

    if deleted {
        list_slots(bot, callback_chat(q), tutor_id, ctx).await?;
    }
    Ok(())
}

pub async fn list_vacations(bot: &Bot, chat_id: ChatId, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let vacations = VacationPeriod::for_tutor(&ctx.db.pool, tutor_id, &ctx.today()).await?;

    let mut text = String::from("🏖 <b>Vacations</b>\n");
    if vacations.is_empty() {
        text.push_str("\nNo vacations planned.");
    }
    for vacation in &vacations {
        text.push_str(&format!(
            "\n• {} – {}",
            escape(&vacation.start_date),
            escape(&vacation.end_date)
        ));
        if let Some(reason) = &vacation.reason {
            text.push_str(&format!(" ({})", escape(reason)));
        }
    }

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "➕ Add vacation",
            CallbackAction::AddVacation.encode(),
        )]]))
        .await?;
    Ok(())
}

pub async fn start_add_vacation(bot: &Bot, q: &CallbackQuery, dialogue: &BotDialogue) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    bot.send_message(callback_chat(q), "🏖 First day of the vacation (YYYY-MM-DD):")
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::AddVacationStart).await?;
    Ok(())
}

pub async fn receive_vacation_start(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    user_id: i64,
) -> HandlerResult {
    let input = msg.text().unwrap_or_default();
    match parse_date(input) {
        Ok(start) => {
            bot.send_message(msg.chat.id, "🏖 Last day of the vacation (YYYY-MM-DD):")
                .await?;
            dialogue
                .update(State::AddVacationEnd {
                    start: format_date(start),
                })
                .await?;
        }
        Err(e) => {
            log_validation_error("vacation_start", input, &e.to_string(), user_id);
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .validation_error(&e.to_string(), "Example: 2024-07-01")
                .await?;
        }
    }
    Ok(())
}

/// The end date must not precede `start`.
pub fn validate_vacation_end(start: &str, input: &str) -> Result<String, ValidationError> {
    let end = parse_date(input)?;
    let start = parse_date(start)?;
    if end < start {
        return Err(ValidationError::EndBeforeStart);
    }
    Ok(format_date(end))
}

pub async fn receive_vacation_end(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    start: String,
    user_id: i64,
) -> HandlerResult {
    let input = msg.text().unwrap_or_default();
    match validate_vacation_end(&start, input) {
        Ok(end) => {
            bot.send_message(msg.chat.id, "✍️ Reason (or \"no\"):").await?;
            dialogue.update(State::AddVacationReason { start, end }).await?;
        }
        Err(e) => {
            log_validation_error("vacation_end", input, &e.to_string(), user_id);
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .validation_error(&e.to_string(), &format!("The vacation starts on {start}."))
                .await?;
        }
    }
    Ok(())
}

pub async fn receive_vacation_reason(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    (start, end): (String, String),
    tutor: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let reason = optional_field(msg.text().unwrap_or_default());
    VacationPeriod::create(&ctx.db.pool, tutor.id, &start, &end, reason.as_deref()).await?;
    dialogue.exit().await?;

    log_command_success(
        "add_vacation",
        &tutor.display_name(),
        tutor.id,
        Some(&format!("{start} - {end}")),
    );
    bot.send_message(
        msg.chat.id,
        format!("✅ Vacation saved: {start} – {end}. Weekly lessons will skip these days."),
    )
    .reply_markup(main_menu(ctx.menu_role(tutor.id, Some(tutor))))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacation_end_may_equal_start() {
        assert_eq!(validate_vacation_end("2024-07-01", "2024-07-01"), Ok("2024-07-01".to_string()));
        assert_eq!(validate_vacation_end("2024-07-01", " 2024-07-14 "), Ok("2024-07-14".to_string()));
    }

    #[test]
    fn vacation_end_before_start_is_refused() {
        assert_eq!(
            validate_vacation_end("2024-07-10", "2024-07-01"),
            Err(ValidationError::EndBeforeStart)
        );
        assert_eq!(
            validate_vacation_end("2024-07-10", "July"),
            Err(ValidationError::InvalidDate)
        );
    }
}
