use std::collections::HashMap;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html::escape;

use super::{active_students, callback_chat, own_student};
use crate::bot::callback_data::CallbackAction;
use crate::bot::context::AppContext;
use crate::bot::dialogue::{BotDialogue, State};
use crate::bot::handlers::HandlerResult;
use crate::bot::keyboards::{cancel_keyboard, main_menu, student_choice};
use crate::database::models::{
    Lesson, LessonStatus, StandardSchedule, Tutor, User, DEFAULT_LESSON_COST,
};
use crate::utils::datetime::{self, format_lesson_time, DATE_FORMAT, TIME_FORMAT};
use crate::utils::feedback::{CommandFeedback, FeedbackType};
use crate::utils::logging::{log_command_success, log_permission_denied, log_validation_error};
use crate::utils::validation::{parse_future_date_time, parse_time, ValidationError};

/// Weeks of lessons created from the weekly template in one go.
pub const GENERATE_WEEKS: u32 = 4;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub fn weekday_name(day_of_week: i64) -> &'static str {
    usize::try_from(day_of_week)
        .ok()
        .and_then(|d| WEEKDAYS.get(d))
        .copied()
        .unwrap_or("?")
}

/// Parses `Mon 16:00` (or `0 16:00`, 0 = Monday) into a day index and a
/// normalized `HH:MM` time.
pub fn parse_weekly_slot(input: &str) -> Result<(u32, String), ValidationError> {
    let mut parts = input.split_whitespace();
    let (Some(day), Some(time), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ValidationError::InvalidDateTime);
    };

    let day = match day.parse::<u32>() {
        Ok(n) if n < 7 => n,
        Ok(_) => return Err(ValidationError::InvalidDateTime),
        Err(_) => {
            let lower = day.to_lowercase();
            let position = WEEKDAYS
                .iter()
                .position(|w| lower.starts_with(&w.to_lowercase()))
                .ok_or(ValidationError::InvalidDateTime)?;
            position as u32
        }
    };
    let time = parse_time(time)?;
    Ok((day, time.format(TIME_FORMAT).to_string()))
}

async fn tutor_cost(ctx: &AppContext, tutor_id: i64) -> Result<(i64, Option<String>), sqlx::Error> {
    Ok(match Tutor::find_by_id(&ctx.db.pool, tutor_id).await? {
        Some(tutor) => (tutor.cost, Some(tutor.name)),
        None => (DEFAULT_LESSON_COST, None),
    })
}

/// Upcoming lessons with complete / cancel / move buttons for open ones.
pub async fn show_schedule(bot: &Bot, chat_id: ChatId, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let lessons = Lesson::upcoming_for_tutor(&ctx.db.pool, tutor_id, &ctx.today()).await?;
    if lessons.is_empty() {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("No upcoming lessons. Use ➕ Add lesson to schedule one.")
            .await?;
        return Ok(());
    }

    let names: HashMap<i64, String> = User::students_of_tutor(&ctx.db.pool, tutor_id, true)
        .await?
        .into_iter()
        .map(|s| (s.id, s.display_name()))
        .collect();

    let mut text = String::from("🗓 <b>Upcoming lessons</b>\n");
    let mut keyboard = Vec::new();
    for lesson in lessons.iter().take(20) {
        let when = format_lesson_time(&lesson.lesson_date, &lesson.lesson_time);
        let student = names
            .get(&lesson.student_id)
            .cloned()
            .unwrap_or_else(|| format!("id {}", lesson.student_id));
        text.push_str(&format!(
            "\n{} {} · {}",
            lesson.status().emoji(),
            when,
            escape(&student)
        ));

        if lesson.is_open() {
            keyboard.push(vec![
                InlineKeyboardButton::callback(
                    format!("✅ {}", lesson.lesson_date),
                    CallbackAction::CompleteLesson(lesson.id).encode(),
                ),
                InlineKeyboardButton::callback("❌", CallbackAction::CancelLesson(lesson.id).encode()),
                InlineKeyboardButton::callback("🔁", CallbackAction::RescheduleLesson(lesson.id).encode()),
            ]);
        }
    }

    let mut request = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
    if !keyboard.is_empty() {
        request = request.reply_markup(InlineKeyboardMarkup::new(keyboard));
    }
    request.await?;
    Ok(())
}

/// Loads a lesson the caller may change, answering the query otherwise.
async fn editable_lesson(
    bot: &Bot,
    q: &CallbackQuery,
    actor: Option<&User>,
    lesson_id: i64,
    ctx: &AppContext,
) -> Result<Option<Lesson>, Box<dyn std::error::Error + Send + Sync>> {
    let actor_id = q.from.id.0 as i64;
    let Some(lesson) = Lesson::find_by_id(&ctx.db.pool, lesson_id).await? else {
        bot.answer_callback_query(q.id.clone()).text("Lesson not found.").await?;
        return Ok(None);
    };
    if lesson.tutor_id != actor_id && !ctx.is_superadmin(actor_id, actor) {
        log_permission_denied("edit_lesson", actor_id);
        bot.answer_callback_query(q.id.clone())
            .text("This lesson belongs to another tutor.")
            .await?;
        return Ok(None);
    }
    if !lesson.is_open() {
        bot.answer_callback_query(q.id.clone())
            .text("This lesson is already closed.")
            .await?;
        return Ok(None);
    }
    Ok(Some(lesson))
}

/// Complete or cancel a lesson from the schedule.
pub async fn close_lesson(
    bot: &Bot,
    q: &CallbackQuery,
    actor: Option<&User>,
    lesson_id: i64,
    status: LessonStatus,
    ctx: &AppContext,
) -> HandlerResult {
    let Some(lesson) = editable_lesson(bot, q, actor, lesson_id, ctx).await? else {
        return Ok(());
    };

    if !Lesson::set_status(&ctx.db.pool, lesson.id, status).await? {
        bot.answer_callback_query(q.id.clone())
            .text("This lesson is already closed.")
            .await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;

    match status {
        LessonStatus::Completed => ctx.notifications.lesson_completed(&lesson).await,
        _ => ctx.notifications.lesson_cancelled(&lesson).await,
    };

    let when = format_lesson_time(&lesson.lesson_date, &lesson.lesson_time);
    let (feedback_type, text) = match status {
        LessonStatus::Completed => (FeedbackType::Success, format!("Lesson on {when} completed.")),
        _ => (FeedbackType::Warning, format!("Lesson on {when} cancelled.")),
    };
    CommandFeedback::new(bot.clone(), callback_chat(q))
        .send(feedback_type, &text)
        .await?;
    Ok(())
}

pub async fn start_reschedule(
    bot: &Bot,
    q: &CallbackQuery,
    actor: Option<&User>,
    dialogue: &BotDialogue,
    lesson_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let Some(lesson) = editable_lesson(bot, q, actor, lesson_id, ctx).await? else {
        return Ok(());
    };
    bot.answer_callback_query(q.id.clone()).await?;

    bot.send_message(
        callback_chat(q),
        format!(
            "🔁 Moving the lesson on {}.\nSend the new date and time: YYYY-MM-DD HH:MM",
            format_lesson_time(&lesson.lesson_date, &lesson.lesson_time)
        ),
    )
    .reply_markup(cancel_keyboard())
    .await?;
    dialogue.update(State::RescheduleLesson { lesson_id }).await?;
    Ok(())
}

pub async fn receive_reschedule(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    lesson_id: i64,
    tutor: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let input = msg.text().unwrap_or_default();
    let at = match parse_future_date_time(input, ctx.now()) {
        Ok(at) => at,
        Err(e) => {
            log_validation_error("reschedule", input, &e.to_string(), tutor.id);
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .validation_error(&e.to_string(), "Example: 2024-03-15 16:00")
                .await?;
            return Ok(());
        }
    };

    let Some(before) = Lesson::find_by_id(&ctx.db.pool, lesson_id).await? else {
        dialogue.exit().await?;
        CommandFeedback::new(bot.clone(), msg.chat.id)
            .error("Lesson not found.")
            .await?;
        return Ok(());
    };

    let date = at.format(DATE_FORMAT).to_string();
    let time = at.format(TIME_FORMAT).to_string();
    let moved = Lesson::reschedule(&ctx.db.pool, lesson_id, &date, &time).await?;
    dialogue.exit().await?;
    let menu = main_menu(ctx.menu_role(tutor.id, Some(tutor)));

    let Some(after) = Lesson::find_by_id(&ctx.db.pool, lesson_id).await?.filter(|_| moved) else {
        bot.send_message(msg.chat.id, "⚠️ This lesson can no longer be moved.")
            .reply_markup(menu)
            .await?;
        return Ok(());
    };

    ctx.notifications
        .lesson_rescheduled(&after, &before.lesson_date, &before.lesson_time)
        .await;
    log_command_success(
        "reschedule_lesson",
        &tutor.display_name(),
        tutor.id,
        Some(&format!("lesson {} to {} {}", lesson_id, date, time)),
    );

    bot.send_message(
        msg.chat.id,
        format!("✅ Lesson moved to {}.", format_lesson_time(&date, &time)),
    )
    .reply_markup(menu)
    .await?;
    Ok(())
}

pub async fn start_add_lesson(
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

    bot.send_message(chat_id, "➕ Who is the lesson with?")
        .reply_markup(student_choice(&students, CallbackAction::LessonStudent))
        .await?;
    dialogue.update(State::AddLessonStudent).await?;
    Ok(())
}

pub async fn choose_lesson_student(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    student_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let tutor_id = q.from.id.0 as i64;
    if own_student(ctx, tutor_id, student_id).await?.is_none() {
        bot.answer_callback_query(q.id.clone()).text("Student not found.").await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;

    bot.send_message(callback_chat(q), "🕐 Send the date and time: YYYY-MM-DD HH:MM")
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::AddLessonDateTime { student_id }).await?;
    Ok(())
}

pub async fn receive_lesson_time(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    student_id: i64,
    tutor: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let input = msg.text().unwrap_or_default();
    let at = match parse_future_date_time(input, ctx.now()) {
        Ok(at) => at,
        Err(e) => {
            log_validation_error("add_lesson", input, &e.to_string(), tutor.id);
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .validation_error(&e.to_string(), "Example: 2024-03-15 16:00")
                .await?;
            return Ok(());
        }
    };

    let student = User::find_by_id(&ctx.db.pool, student_id).await?;
    let (cost, tutor_name) = tutor_cost(ctx, tutor.id).await?;
    let date = at.format(DATE_FORMAT).to_string();
    let time = at.format(TIME_FORMAT).to_string();

    let lesson = Lesson::create(
        &ctx.db.pool,
        student_id,
        tutor.id,
        &date,
        &time,
        student.as_ref().and_then(|s| s.subject.as_deref()),
        cost,
    )
    .await?;
    dialogue.exit().await?;

    let tutor_name = tutor_name.unwrap_or_else(|| tutor.display_name());
    let notified = ctx.notifications.lesson_added(&lesson, &tutor_name).await;
    log_command_success(
        "add_lesson",
        &tutor.display_name(),
        tutor.id,
        Some(&format!("lesson {} with {}", lesson.id, student_id)),
    );

    let mut text = format!("✅ Lesson scheduled for {}.", format_lesson_time(&date, &time));
    if !notified {
        text.push_str(" The student could not be notified.");
    }
    bot.send_message(msg.chat.id, text)
        .reply_markup(main_menu(ctx.menu_role(tutor.id, Some(tutor))))
        .await?;
    Ok(())
}

/// Weekly template overview with add / generate actions.
pub async fn show_weekly_schedule(bot: &Bot, chat_id: ChatId, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let templates = StandardSchedule::for_tutor(&ctx.db.pool, tutor_id).await?;
    let names: HashMap<i64, String> = User::students_of_tutor(&ctx.db.pool, tutor_id, true)
        .await?
        .into_iter()
        .map(|s| (s.id, s.display_name()))
        .collect();

    let mut text = String::from("🔁 <b>Weekly schedule</b>\n");
    if templates.is_empty() {
        text.push_str("\nNo weekly lessons yet.");
    }
    for template in &templates {
        let student = names
            .get(&template.student_id)
            .cloned()
            .unwrap_or_else(|| format!("id {}", template.student_id));
        text.push_str(&format!(
            "\n{} {} · {}",
            weekday_name(template.day_of_week),
            escape(&template.time),
            escape(&student)
        ));
    }

    let mut keyboard = vec![vec![InlineKeyboardButton::callback(
        "➕ Add weekly lesson",
        CallbackAction::AddTemplate.encode(),
    )]];
    if !templates.is_empty() {
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!("📅 Create lessons for {GENERATE_WEEKS} weeks"),
            CallbackAction::GenerateLessons.encode(),
        )]);
    }

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(keyboard))
        .await?;
    Ok(())
}

pub async fn start_add_template(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    ctx: &AppContext,
) -> HandlerResult {
    let tutor_id = q.from.id.0 as i64;
    let students = active_students(ctx, tutor_id).await?;
    if students.is_empty() {
        bot.answer_callback_query(q.id.clone()).text("You have no students yet.").await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;

    bot.send_message(callback_chat(q), "🔁 Whose weekly lesson is it?")
        .reply_markup(student_choice(&students, CallbackAction::TemplateStudent))
        .await?;
    dialogue.update(State::AddTemplateStudent).await?;
    Ok(())
}

pub async fn choose_template_student(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    student_id: i64,
    ctx: &AppContext,
) -> HandlerResult {
    let tutor_id = q.from.id.0 as i64;
    if own_student(ctx, tutor_id, student_id).await?.is_none() {
        bot.answer_callback_query(q.id.clone()).text("Student not found.").await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;

    bot.send_message(callback_chat(q), "🕐 Day and time, e.g. \"Mon 16:00\" or \"0 16:00\":")
        .reply_markup(cancel_keyboard())
        .await?;
    dialogue.update(State::AddTemplateTime { student_id }).await?;
    Ok(())
}

pub async fn receive_template_time(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    student_id: i64,
    tutor: &User,
    ctx: &AppContext,
) -> HandlerResult {
    let input = msg.text().unwrap_or_default();
    let (day, time) = match parse_weekly_slot(input) {
        Ok(slot) => slot,
        Err(e) => {
            log_validation_error("weekly_template", input, &e.to_string(), tutor.id);
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .validation_error(&e.to_string(), "Example: Mon 16:00")
                .await?;
            return Ok(());
        }
    };

    let subject = User::find_by_id(&ctx.db.pool, student_id)
        .await?
        .and_then(|s| s.subject);
    StandardSchedule::create(&ctx.db.pool, tutor.id, student_id, day, &time, subject.as_deref()).await?;
    dialogue.exit().await?;

    bot.send_message(
        msg.chat.id,
        format!("✅ Weekly lesson added: every {} at {}.", weekday_name(i64::from(day)), time),
    )
    .reply_markup(main_menu(ctx.menu_role(tutor.id, Some(tutor))))
    .await?;
    Ok(())
}

/// Expands every student's weekly template into concrete lessons.
pub async fn generate_from_template(bot: &Bot, q: &CallbackQuery, ctx: &AppContext) -> HandlerResult {
    let tutor_id = q.from.id.0 as i64;
    bot.answer_callback_query(q.id.clone()).await?;

    let templates = StandardSchedule::for_tutor(&ctx.db.pool, tutor_id).await?;
    let mut students: Vec<i64> = templates.iter().map(|t| t.student_id).collect();
    students.sort_unstable();
    students.dedup();

    let (cost, tutor_name) = tutor_cost(ctx, tutor_id).await?;
    let tutor_name = tutor_name.unwrap_or_else(|| "your tutor".to_string());
    let today = datetime::today(ctx.utc_offset_hours);

    let mut created = 0usize;
    for student_id in students {
        let lessons =
            StandardSchedule::generate_lessons(&ctx.db.pool, tutor_id, student_id, GENERATE_WEEKS, today, cost)
                .await?;
        for lesson in &lessons {
            ctx.notifications.lesson_added(lesson, &tutor_name).await;
        }
        created += lessons.len();
    }

    log_command_success(
        "generate_lessons",
        &tutor_id.to_string(),
        tutor_id,
        Some(&format!("{created} lessons")),
    );

    let text = if created == 0 {
        "No new lessons: the next weeks are already planned or on vacation.".to_string()
    } else {
        format!("Created {created} lesson(s) for the next {GENERATE_WEEKS} weeks.")
    };
    bot.send_message(callback_chat(q), text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_slot_accepts_names_and_numbers() {
        assert_eq!(parse_weekly_slot("Mon 16:00"), Ok((0, "16:00".to_string())));
        assert_eq!(parse_weekly_slot("sunday 9:05"), Ok((6, "09:05".to_string())));
        assert_eq!(parse_weekly_slot("3 18:30"), Ok((3, "18:30".to_string())));
    }

    #[test]
    fn weekly_slot_rejects_garbage() {
        assert!(parse_weekly_slot("7 10:00").is_err());
        assert!(parse_weekly_slot("Funday 10:00").is_err());
        assert!(parse_weekly_slot("Mon").is_err());
        assert!(parse_weekly_slot("Mon 25:00").is_err());
        assert!(parse_weekly_slot("Mon 10:00 extra").is_err());
    }

    #[test]
    fn weekday_names_cover_the_week() {
        assert_eq!(weekday_name(0), "Mon");
        assert_eq!(weekday_name(6), "Sun");
        assert_eq!(weekday_name(9), "?");
    }
}
