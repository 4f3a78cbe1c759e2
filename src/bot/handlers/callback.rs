use teloxide::prelude::*;

use super::HandlerResult;
use crate::bot::callback_data::CallbackAction;
use crate::bot::commands::{
    availability, callback_chat, homework, lessons, profile, registration, requests, start, student,
    superadmin,
};
use crate::bot::context::AppContext;
use crate::bot::dialogue::{BotDialogue, State};
use crate::database::models::LessonStatus;
use crate::utils::logging::log_permission_denied;

async fn expired(bot: &Bot, q: &CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(q.id.clone())
        .text("This button has expired.")
        .await?;
    Ok(())
}

async fn denied(bot: &Bot, q: &CallbackQuery, action: &str) -> HandlerResult {
    log_permission_denied(action, q.from.id.0 as i64);
    bot.answer_callback_query(q.id.clone())
        .text("You don't have access to this action.")
        .await?;
    Ok(())
}

pub async fn callback_handler(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &BotDialogue,
    state: State,
    ctx: &AppContext,
) -> HandlerResult {
    let user_id = q.from.id.0 as i64;
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    tracing::info!(
        "Callback received: '{}' from user {} ({})",
        data,
        q.from.username.as_deref().unwrap_or("unknown"),
        user_id
    );

    let Some(action) = CallbackAction::parse(data) else {
        return expired(bot, q).await;
    };

    let user = ctx.load_user(user_id).await?;
    let is_tutor = ctx.can_tutor(user_id, user.as_ref()) && user.is_some();
    let is_superadmin = ctx.is_superadmin(user_id, user.as_ref());

    match (action, state) {
        (CallbackAction::Cancel, _) => {
            bot.answer_callback_query(q.id.clone()).await?;
            start::cancel(bot, callback_chat(q), user_id, dialogue, ctx).await
        }

        (CallbackAction::ChooseTutor(tutor_id), State::Registration(registration_state)) => {
            registration::choose_tutor(bot, q, dialogue, &registration_state, tutor_id, ctx).await
        }

        (CallbackAction::ApproveRequest(id), _) => {
            requests::decide_request(bot, q, user.as_ref(), id, true, ctx).await
        }
        (CallbackAction::RejectRequest(id), _) => {
            requests::decide_request(bot, q, user.as_ref(), id, false, ctx).await
        }
        (CallbackAction::RefreshRequests, _) if is_tutor => {
            bot.answer_callback_query(q.id.clone()).await?;
            requests::list_requests(bot, callback_chat(q), user_id, ctx).await
        }

        (CallbackAction::HomeworkStudent(student_id), State::AssignHomeworkStudent) if is_tutor => {
            homework::choose_student(bot, q, dialogue, student_id, ctx).await
        }
        (CallbackAction::HomeworkType(content_type), State::AssignHomeworkType { student_id }) if is_tutor => {
            homework::choose_type(bot, q, dialogue, student_id, content_type).await
        }
        (CallbackAction::HomeworkReminder(homework_id), _) if is_tutor => {
            homework::start_reminder(bot, q, dialogue, homework_id, ctx).await
        }
        (CallbackAction::HomeworkChecked(homework_id), _) => {
            homework::mark_checked(bot, q, user.as_ref(), homework_id, ctx).await
        }
        (CallbackAction::ViewHomework(homework_id), _) => {
            bot.answer_callback_query(q.id.clone()).await?;
            student::view_homework(bot, callback_chat(q), user_id, homework_id, ctx).await
        }
        (CallbackAction::SubmitHomework(homework_id), _) => {
            homework::start_submission(bot, q, dialogue, homework_id, ctx).await
        }
        (CallbackAction::SubmissionType(content_type), State::SubmitHomeworkType { homework_id }) => {
            homework::choose_submission_type(bot, q, dialogue, homework_id, content_type).await
        }

        (CallbackAction::LessonStudent(student_id), State::AddLessonStudent) if is_tutor => {
            lessons::choose_lesson_student(bot, q, dialogue, student_id, ctx).await
        }
        (CallbackAction::CompleteLesson(lesson_id), _) => {
            lessons::close_lesson(bot, q, user.as_ref(), lesson_id, LessonStatus::Completed, ctx).await
        }
        (CallbackAction::CancelLesson(lesson_id), _) => {
            lessons::close_lesson(bot, q, user.as_ref(), lesson_id, LessonStatus::Cancelled, ctx).await
        }
        (CallbackAction::RescheduleLesson(lesson_id), _) => {
            lessons::start_reschedule(bot, q, user.as_ref(), dialogue, lesson_id, ctx).await
        }
        (CallbackAction::AddTemplate, _) if is_tutor => lessons::start_add_template(bot, q, dialogue, ctx).await,
        (CallbackAction::TemplateStudent(student_id), State::AddTemplateStudent) if is_tutor => {
            lessons::choose_template_student(bot, q, dialogue, student_id, ctx).await
        }
        (CallbackAction::GenerateLessons, _) if is_tutor => lessons::generate_from_template(bot, q, ctx).await,

        (CallbackAction::AddSlot, _) if is_tutor => availability::start_add_slot(bot, q, dialogue).await,
        (CallbackAction::DeleteSlot(slot_id), _) if is_tutor => {
            availability::delete_slot(bot, q, slot_id, ctx).await
        }
        (CallbackAction::AddVacation, _) if is_tutor => availability::start_add_vacation(bot, q, dialogue).await,
        (CallbackAction::EditProfile(field), _) if is_tutor => profile::start_edit(bot, q, dialogue, field).await,

        (CallbackAction::MessageTutor(tutor_id), _) => match &user {
            Some(user) => {
                bot.answer_callback_query(q.id.clone()).await?;
                student::start_message_tutor(bot, callback_chat(q), user, tutor_id, dialogue).await
            }
            None => expired(bot, q).await,
        },

        (CallbackAction::SetRole(role), State::ChangeRoleSelect { user_id: target }) if is_superadmin => {
            superadmin::choose_role(bot, q, dialogue, target, role, ctx).await
        }
        (CallbackAction::DeleteTutor(tutor_id), _) if is_superadmin => {
            superadmin::confirm_remove(bot, q, tutor_id, ctx).await
        }
        (CallbackAction::ConfirmDeleteTutor(tutor_id), _) if is_superadmin => {
            superadmin::execute_remove(bot, q, tutor_id, ctx).await
        }

        (
            CallbackAction::RefreshRequests
            | CallbackAction::HomeworkReminder(_)
            | CallbackAction::AddTemplate
            | CallbackAction::GenerateLessons
            | CallbackAction::AddSlot
            | CallbackAction::DeleteSlot(_)
            | CallbackAction::AddVacation
            | CallbackAction::EditProfile(_)
            | CallbackAction::DeleteTutor(_)
            | CallbackAction::ConfirmDeleteTutor(_),
            _,
        ) => denied(bot, q, data).await,

        // Flow buttons pressed outside their flow, or by the wrong role.
        _ => expired(bot, q).await,
    }
}
