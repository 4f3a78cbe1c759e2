use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html::escape;

use crate::bot::callback_data::CallbackAction;
use crate::bot::context::AppContext;
use crate::bot::dialogue::{BotDialogue, State};
use crate::bot::handlers::HandlerResult;
use crate::bot::keyboards::{cancel_keyboard, main_menu};
use crate::database::models::{
    ContentType, DirectMessage, Homework, HomeworkStatus, Lesson, Tutor, User,
};
use crate::utils::datetime::format_lesson_time;
use crate::utils::feedback::CommandFeedback;
use crate::utils::validation::validate_text;

pub async fn my_lessons(bot: &Bot, chat_id: ChatId, user_id: i64, ctx: &AppContext) -> HandlerResult {
    let lessons = Lesson::upcoming_for_student(&ctx.db.pool, user_id, &ctx.today()).await?;

    if lessons.is_empty() {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("You have no upcoming lessons.")
            .await?;
        return Ok(());
    }

    let mut text = String::from("📅 <b>Your upcoming lessons</b>\n");
    for lesson in &lessons {
        text.push_str(&format!(
            "\n{} {}",
            lesson.status().emoji(),
            format_lesson_time(&lesson.lesson_date, &lesson.lesson_time)
        ));
        if let Some(subject) = &lesson.subject {
            text.push_str(&format!(" · {}", escape(subject)));
        }
    }

    bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}

pub async fn my_homework(bot: &Bot, chat_id: ChatId, user_id: i64, ctx: &AppContext) -> HandlerResult {
    let homework = Homework::for_student(&ctx.db.pool, user_id).await?;

    if homework.is_empty() {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("You have no homework yet.")
            .await?;
        return Ok(());
    }

    let keyboard = InlineKeyboardMarkup::new(homework.iter().take(20).map(|hw| {
        vec![InlineKeyboardButton::callback(
            format!("{} {}", hw.status().emoji(), hw.title()),
            CallbackAction::ViewHomework(hw.id).encode(),
        )]
    }));

    bot.send_message(chat_id, "📚 <b>Your homework</b>\n\nTap an assignment to open it.")
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// Homework detail, visible to its student and its tutor.
pub async fn view_homework(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    homework_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let Some(homework) = Homework::find_by_id(&ctx.db.pool, homework_id).await? else {
        CommandFeedback::new(bot.clone(), chat_id)
            .error("Homework not found.")
            .await?;
        return Ok(());
    };
    if homework.student_id != user_id && homework.tutor_id != user_id {
        CommandFeedback::new(bot.clone(), chat_id)
            .error("This homework is not yours.")
            .await?;
        return Ok(());
    }

    let status = homework.status();
    let mut text = format!(
        "{} <b>Homework #{}</b>\nStatus: {}\nAssigned: {}\n",
        status.emoji(),
        homework.id,
        status.as_str(),
        escape(&homework.assigned_at)
    );
    if let Some(description) = &homework.description {
        text.push_str(&format!("\n{}\n", escape(description)));
    }
    if homework.content_type() == ContentType::Text {
        text.push_str(&format!("\n{}", escape(&homework.content_data)));
    }

    let mut buttons = Vec::new();
    if status == HomeworkStatus::Assigned && homework.student_id == user_id {
        buttons.push(vec![InlineKeyboardButton::callback(
            "📤 Submit",
            CallbackAction::SubmitHomework(homework.id).encode(),
        )]);
    }

    let mut request = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
    if !buttons.is_empty() {
        request = request.reply_markup(InlineKeyboardMarkup::new(buttons));
    }
    request.await?;

    // Media content is re-sent so the student does not have to scroll back.
    let content_type = homework.content_type();
    if content_type != ContentType::Text {
        ctx.notifications
            .resend_media(user_id, content_type, &homework.content_data)
            .await;
    }
    Ok(())
}

pub async fn my_tutor(bot: &Bot, chat_id: ChatId, user: &User, ctx: &AppContext) -> HandlerResult {
    let tutor = match user.tutor_id {
        Some(tutor_id) => Tutor::find_by_id(&ctx.db.pool, tutor_id).await?,
        None => None,
    };
    let Some(tutor) = tutor else {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("You don't have a tutor yet. Press /start to register.")
            .await?;
        return Ok(());
    };

    let mut text = format!("👨‍🏫 <b>{}</b>\n", escape(&tutor.name));
    if let Some(subjects) = &tutor.subjects {
        text.push_str(&format!("📚 {}\n", escape(subjects)));
    }
    text.push_str(&format!("💰 {} per lesson\n", tutor.cost));
    if let Some(username) = &tutor.username {
        text.push_str(&format!("🔗 @{}\n", escape(username)));
    }
    if let Some(link) = &tutor.link {
        text.push_str(&format!("🌐 {}\n", escape(link)));
    }

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "✉️ Write to tutor",
        CallbackAction::MessageTutor(tutor.id).encode(),
    )]]);
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

pub async fn start_message_tutor(
    bot: &Bot,
    chat_id: ChatId,
    user: &User,
    tutor_id: i64,
    dialogue: &BotDialogue,
) -> HandlerResult {
    if user.tutor_id != Some(tutor_id) {
        CommandFeedback::new(bot.clone(), chat_id)
            .error("You can only write to your own tutor.")
            .await?;
        return Ok(());
    }
    bot.send_message(chat_id, "✉️ Write your message:")
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::MessageTutor { tutor_id }).await?;
    Ok(())
}

/// Stores the message and forwards it to the tutor.
pub async fn receive_message_for_tutor(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    tutor_id: i64,
    user: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let content = match validate_text(msg.text().unwrap_or_default(), 2000) {
        Ok(content) => content,
        Err(e) => {
            feedback.validation_error(&e.to_string(), "Send a text message.").await?;
            return Ok(());
        }
    };

    DirectMessage::create(&ctx.db.pool, user.id, tutor_id, &content).await?;
    dialogue.exit().await?;

    let delivered = ctx
        .notifications
        .direct_message(tutor_id, &user.display_name(), &content)
        .await;
    let text = if delivered {
        "✅ Message sent to your tutor."
    } else {
        "⚠️ Message saved, but the tutor could not be reached right now."
    };
    bot.send_message(msg.chat.id, text)
        .reply_markup(main_menu(ctx.menu_role(user.id, Some(user))))
        .await?;
    Ok(())
}
