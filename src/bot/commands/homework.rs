use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html::escape;

use super::{active_students, callback_chat, own_student};
use crate::bot::callback_data::CallbackAction;
use crate::bot::context::AppContext;
use crate::bot::dialogue::{BotDialogue, State};
use crate::bot::handlers::HandlerResult;
use crate::bot::keyboards::{cancel_keyboard, content_type_choice, main_menu, student_choice};
use crate::database::models::{ContentType, Homework, HomeworkStatus, Tutor, User};
use crate::utils::datetime::{DATE_FORMAT, TIME_FORMAT};
use crate::utils::feedback::{CommandFeedback, FeedbackType};
use crate::utils::logging::{log_command_success, log_permission_denied, log_validation_error};
use crate::utils::validation::{parse_future_date_time, validate_text};

const MAX_TEXT_HOMEWORK: usize = 3000;

/// Pulls the payload of the expected kind out of a message: the text for
/// text content, otherwise the Telegram file id plus the caption.
pub fn extract_content(msg: &Message, content_type: ContentType) -> Option<(String, Option<String>)> {
    let caption = msg.caption().map(str::to_string);
    match content_type {
        ContentType::Text => msg.text().map(|t| (t.to_string(), None)),
        ContentType::Photo => msg
            .photo()
            .and_then(|sizes| sizes.last())
            .map(|p| (p.file.id.clone(), caption)),
        ContentType::File => msg.document().map(|d| (d.file.id.clone(), caption)),
        ContentType::Voice => msg.voice().map(|v| (v.file.id.clone(), caption)),
        ContentType::Video => msg.video().map(|v| (v.file.id.clone(), caption)),
    }
}

fn expecting(content_type: ContentType) -> String {
    format!("Send {} now.", content_type.label())
}

pub async fn start_assign(
    bot: &Bot,
    chat_id: ChatId,
    tutor_id: i64,
    dialogue: &BotDialogue,
    ctx: &AppContext,
) -> HandlerResult {
    let students = active_students(ctx, tutor_id).await?;
    if students.is_empty() {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("You have no students yet.")
            .await?;
        return Ok(());
    }

    bot.send_message(chat_id, "📝 Who is the homework for?")
        .reply_markup(student_choice(&students, CallbackAction::HomeworkStudent))
        .await?;
    dialogue.update(State::AssignHomeworkStudent).await?;
    Ok(())
}

pub async fn choose_student(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    student_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let tutor_id = q.from.id.0 as i64;
    let Some(student) = own_student(ctx, tutor_id, student_id).await? else {
        bot.answer_callback_query(q.id.clone()).text("Student not found.").await?;
        return Ok(());
    };
    bot.answer_callback_query(q.id.clone()).await?;

    bot.send_message(
        callback_chat(q),
        format!("📝 Homework for <b>{}</b>. Choose the format:", escape(&student.display_name())),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(content_type_choice(CallbackAction::HomeworkType))
    .await?;
    dialogue.update(State::AssignHomeworkType { student_id }).await?;
    Ok(())
}

pub async fn choose_type(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    student_id: i64,
    content_type: ContentType,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let prompt = match content_type {
        ContentType::Text => "✍️ Send the assignment text.".to_string(),
        other => format!("Send the {} with the assignment. A caption becomes its description.", other.label()),
    };
    bot.send_message(callback_chat(q), prompt)
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue
        .update(State::AssignHomeworkContent {
            student_id,
            content_type,
        })
        .await?;
    Ok(())
}

/// Final step of assignment: store, notify the student, offer a reminder.
pub async fn receive_assignment(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    student_id: i64,
    content_type: ContentType,
    tutor: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let Some((data, caption)) = extract_content(msg, content_type) else {
        feedback
            .validation_error("This is not the format you chose.", &expecting(content_type))
            .await?;
        return Ok(());
    };
    let data = if content_type == ContentType::Text {
        match validate_text(&data, MAX_TEXT_HOMEWORK) {
            Ok(text) => text,
            Err(e) => {
                log_validation_error("homework_text", &data, &e.to_string(), tutor.id);
                feedback.validation_error(&e.to_string(), &expecting(content_type)).await?;
                return Ok(());
            }
        }
    } else {
        data
    };

    let homework = Homework::assign(
        &ctx.db.pool,
        student_id,
        tutor.id,
        content_type,
        &data,
        caption.as_deref(),
    )
    .await?;
    dialogue.exit().await?;

    let tutor_name = Tutor::find_by_id(&ctx.db.pool, tutor.id)
        .await?
        .map(|t| t.name)
        .unwrap_or_else(|| tutor.display_name());
    let delivered = ctx.notifications.homework_assigned(&homework, &tutor_name).await;

    log_command_success(
        "assign_homework",
        &tutor.display_name(),
        tutor.id,
        Some(&format!("homework {} for {}", homework.id, student_id)),
    );

    let text = if delivered {
        "✅ Homework assigned and sent to the student."
    } else {
        "⚠️ Homework saved, but the student could not be notified."
    };
    bot.send_message(msg.chat.id, text)
        .reply_markup(main_menu(ctx.menu_role(tutor.id, Some(tutor))))
        .await?;
    bot.send_message(msg.chat.id, "Set a reminder for the student?")
        .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "⏰ Set reminder",
            CallbackAction::HomeworkReminder(homework.id).encode(),
        )]]))
        .await?;
    Ok(())
}

pub async fn start_reminder(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    homework_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let tutor_id = q.from.id.0 as i64;
    let homework = Homework::find_by_id(&ctx.db.pool, homework_id).await?;
    if !homework.as_ref().is_some_and(|hw| hw.tutor_id == tutor_id) {
        bot.answer_callback_query(q.id.clone()).text("Homework not found.").await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;

    bot.send_message(callback_chat(q), "⏰ When should the student be reminded? Format: YYYY-MM-DD HH:MM")
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::HomeworkReminder { homework_id }).await?;
    Ok(())
}

pub async fn receive_reminder(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    homework_id: i64,
    tutor: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let input = msg.text().unwrap_or_default();
    let at = match parse_future_date_time(input, ctx.now()) {
        Ok(at) => at,
        Err(e) => {
            log_validation_error("homework_reminder", input, &e.to_string(), tutor.id);
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .validation_error(&e.to_string(), "Example: 2024-03-15 18:00")
                .await?;
            return Ok(());
        }
    };

    let date = at.format(DATE_FORMAT).to_string();
    let time = at.format(TIME_FORMAT).to_string();
    Homework::set_reminder(&ctx.db.pool, homework_id, &date, &time).await?;
    dialogue.exit().await?;

    bot.send_message(msg.chat.id, format!("✅ Reminder set for {date} {time}."))
        .reply_markup(main_menu(ctx.menu_role(tutor.id, Some(tutor))))
        .await?;
    Ok(())
}

/// Student pressed "Submit" under an assignment.
pub async fn start_submission(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    homework_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let student_id = q.from.id.0 as i64;
    let homework = Homework::find_by_id(&ctx.db.pool, homework_id).await?;
    let Some(homework) = homework.filter(|hw| hw.student_id == student_id) else {
        bot.answer_callback_query(q.id.clone()).text("Homework not found.").await?;
        return Ok(());
    };
    if homework.status() != HomeworkStatus::Assigned {
        bot.answer_callback_query(q.id.clone())
            .text("This homework was already submitted.")
            .await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;

    bot.send_message(
        callback_chat(q),
        format!("📤 Submitting \"{}\". Choose the answer format:", homework.title()),
    )
    .reply_markup(content_type_choice(CallbackAction::SubmissionType))
    .await?;
    dialogue.update(State::SubmitHomeworkType { homework_id }).await?;
    Ok(())
}

pub async fn choose_submission_type(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    homework_id: i64,
    content_type: ContentType,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    bot.send_message(callback_chat(q), expecting(content_type))
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue
        .update(State::SubmitHomeworkContent {
            homework_id,
            content_type,
        })
        .await?;
    Ok(())
}

pub async fn receive_submission(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    homework_id: i64,
    content_type: ContentType,
    student: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);
    let Some((data, _)) = extract_content(msg, content_type) else {
        feedback
            .validation_error("This is not the format you chose.", &expecting(content_type))
            .await?;
        return Ok(());
    };
    let data = if content_type == ContentType::Text {
        match validate_text(&data, MAX_TEXT_HOMEWORK) {
            Ok(text) => text,
            Err(e) => {
                feedback.validation_error(&e.to_string(), &expecting(content_type)).await?;
                return Ok(());
            }
        }
    } else {
        data
    };

    let submitted = Homework::submit(&ctx.db.pool, homework_id, content_type, &data).await?;
    dialogue.exit().await?;
    let menu = main_menu(ctx.menu_role(student.id, Some(student)));

    let homework = match Homework::find_by_id(&ctx.db.pool, homework_id).await? {
        Some(homework) if submitted => homework,
        _ => {
            bot.send_message(msg.chat.id, "⚠️ This homework can no longer be submitted.")
                .reply_markup(menu)
                .await?;
            return Ok(());
        }
    };

    let delivered = ctx
        .notifications
        .homework_submitted(&homework, &student.display_name())
        .await;
    log_command_success(
        "submit_homework",
        &student.display_name(),
        student.id,
        Some(&format!("homework {}", homework.id)),
    );

    let text = if delivered {
        "✅ Your answer was sent to the tutor."
    } else {
        "✅ Your answer was saved. The tutor will see it in their submissions."
    };
    bot.send_message(msg.chat.id, text).reply_markup(menu).await?;
    Ok(())
}

/// Submitted homework waiting for the tutor's check.
pub async fn list_submissions(bot: &Bot, chat_id: ChatId, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let submitted: Vec<Homework> = Homework::for_tutor(&ctx.db.pool, tutor_id)
        .await?
        .into_iter()
        .filter(|hw| hw.status() == HomeworkStatus::Submitted)
        .collect();

    if submitted.is_empty() {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("No submissions waiting for a check.")
            .await?;
        return Ok(());
    }

    for homework in &submitted {
        let student = User::find_by_id(&ctx.db.pool, homework.student_id).await?;
        let student_name = student
            .map(|s| s.display_name())
            .unwrap_or_else(|| format!("id {}", homework.student_id));

        let mut text = format!(
            "📤 <b>{}</b>\n👤 {}\n🕐 {}",
            escape(&homework.title()),
            escape(&student_name),
            escape(homework.submitted_at.as_deref().unwrap_or("-")),
        );
        let media = match (homework.submission_type(), homework.submission_data.as_deref()) {
            (Some(ContentType::Text), Some(answer)) => {
                text.push_str(&format!("\n\n{}", escape(answer)));
                None
            }
            (Some(kind), Some(file_id)) => Some((kind, file_id)),
            _ => None,
        };

        if let Some((kind, file_id)) = media {
            ctx.notifications.resend_media(chat_id.0, kind, file_id).await;
        }
        bot.send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "✅ Mark as checked",
                CallbackAction::HomeworkChecked(homework.id).encode(),
            )]]))
            .await?;
    }
    Ok(())
}

pub async fn mark_checked(
    bot: &Bot,
    q: &CallbackQuery,
    actor: Option<&User>,
    homework_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let actor_id = q.from.id.0 as i64;
    let Some(homework) = Homework::find_by_id(&ctx.db.pool, homework_id).await? else {
        bot.answer_callback_query(q.id.clone()).text("Homework not found.").await?;
        return Ok(());
    };
    if homework.tutor_id != actor_id && !ctx.is_superadmin(actor_id, actor) {
        log_permission_denied("mark_checked", actor_id);
        bot.answer_callback_query(q.id.clone())
            .text("This homework belongs to another tutor.")
            .await?;
        return Ok(());
    }

    if !Homework::mark_checked(&ctx.db.pool, homework.id).await? {
        bot.answer_callback_query(q.id.clone())
            .text("This homework is not waiting for a check.")
            .await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;
    ctx.notifications.homework_checked(&homework).await;

    if let Some(message) = &q.message {
        CommandFeedback::new(bot.clone(), message.chat.id)
            .update_message(
                message.id,
                FeedbackType::Success,
                &format!("Checked: {}", homework.title()),
            )
            .await?;
    }
    Ok(())
}
