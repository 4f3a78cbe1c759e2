use teloxide::prelude::*;

use super::{general_message, HandlerResult};
use crate::bot::commands::{
    availability, homework, lessons, profile, registration, requests, start, stats, student, superadmin,
    Command,
};
use crate::bot::context::AppContext;
use crate::bot::dialogue::{is_cancel_text, BotDialogue, State};
use crate::bot::keyboards::MenuButton;
use crate::database::models::User;
use crate::services::roles::Role;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_start, log_permission_denied};

pub async fn command_handler(
    bot: &Bot,
    msg: &Message,
    cmd: Command,
    dialogue: &BotDialogue,
    ctx: &AppContext,
) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    let username = from.username.as_deref().unwrap_or("unknown");
    log_command_start(&format!("{cmd:?}").to_lowercase(), username, user_id, None);

    match cmd {
        Command::Start => start::handle_start(bot, msg, dialogue, ctx).await,
        Command::Help => start::handle_help(bot, msg, ctx).await,
        Command::Menu => {
            dialogue.exit().await?;
            start::show_menu(bot, msg, ctx).await
        }
        Command::Cancel => start::cancel(bot, msg.chat.id, user_id, dialogue, ctx).await,
        Command::Admin => start::switch_menu(bot, msg, ctx, Role::Admin).await,
        Command::Superadmin => start::switch_menu(bot, msg, ctx, Role::Superadmin).await,
        Command::Student => start::switch_menu(bot, msg, ctx, Role::Student).await,
    }
}

/// Plain messages: menu buttons first, then whatever the dialogue waits for.
pub async fn message_handler(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    state: State,
    ctx: &AppContext,
) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;

    if msg.text().is_some_and(is_cancel_text) {
        return start::cancel(bot, msg.chat.id, user_id, dialogue, ctx).await;
    }
    if let Some(button) = msg.text().and_then(MenuButton::from_text) {
        // A menu button abandons any unfinished flow.
        if !state.is_idle() {
            dialogue.exit().await?;
        }
        return route_button(bot, msg, button, user_id, dialogue, ctx).await;
    }

    if let State::Registration(registration_state) = state {
        return registration::handle_input(bot, msg, dialogue, registration_state, ctx).await;
    }
    if state.is_idle() {
        return general_message::handle_general_message(bot, msg, ctx).await;
    }

    let Some(user) = ctx.load_user(user_id).await? else {
        dialogue.exit().await?;
        CommandFeedback::new(bot.clone(), msg.chat.id)
            .info("Press /start first.")
            .await?;
        return Ok(());
    };

    match state {
        State::Idle | State::Registration(_) => Ok(()),

        State::AssignHomeworkStudent
        | State::AddLessonStudent
        | State::AddTemplateStudent
        | State::AssignHomeworkType { .. }
        | State::SubmitHomeworkType { .. }
        | State::ChangeRoleSelect { .. } => {
            CommandFeedback::new(bot.clone(), msg.chat.id)
                .info("Please use the buttons above, or press ❌ Cancel.")
                .await?;
            Ok(())
        }

        State::AssignHomeworkContent {
            student_id,
            content_type,
        } => homework::receive_assignment(bot, msg, dialogue, student_id, content_type, &user, ctx).await,
        State::HomeworkReminder { homework_id } => {
            homework::receive_reminder(bot, msg, dialogue, homework_id, &user, ctx).await
        }
        State::SubmitHomeworkContent {
            homework_id,
            content_type,
        } => homework::receive_submission(bot, msg, dialogue, homework_id, content_type, &user, ctx).await,

        State::AddLessonDateTime { student_id } => {
            lessons::receive_lesson_time(bot, msg, dialogue, student_id, &user, ctx).await
        }
        State::RescheduleLesson { lesson_id } => {
            lessons::receive_reschedule(bot, msg, dialogue, lesson_id, &user, ctx).await
        }
        State::AddTemplateTime { student_id } => {
            lessons::receive_template_time(bot, msg, dialogue, student_id, &user, ctx).await
        }

        State::AddSlot => availability::receive_slot(bot, msg, dialogue, &user, ctx).await,
        State::AddVacationStart => availability::receive_vacation_start(bot, msg, dialogue, user.id).await,
        State::AddVacationEnd { start } => {
            availability::receive_vacation_end(bot, msg, dialogue, start, user.id).await
        }
        State::AddVacationReason { start, end } => {
            availability::receive_vacation_reason(bot, msg, dialogue, (start, end), &user, ctx).await
        }

        State::EditProfile { field } => profile::receive_edit(bot, msg, dialogue, field, &user, ctx).await,
        State::MessageTutor { tutor_id } => {
            student::receive_message_for_tutor(bot, msg, dialogue, tutor_id, &user, ctx).await
        }

        State::ChangeRoleUser => superadmin::receive_role_user(bot, msg, dialogue, user.id, ctx).await,
        State::AddTutor(step) => superadmin::receive_add_tutor(bot, msg, dialogue, step, &user, ctx).await,
    }
}

fn permitted(button: MenuButton, user_id: i64, user: Option<&User>, ctx: &AppContext) -> bool {
    match button.required_role() {
        Role::Superadmin => ctx.is_superadmin(user_id, user),
        Role::Admin => ctx.can_tutor(user_id, user),
        _ => user.is_some_and(|u| !matches!(u.role(), Role::Unregistered | Role::Archived)),
    }
}

async fn route_button(
    bot: &Bot,
    msg: &Message,
    button: MenuButton,
    user_id: i64,
    dialogue: &BotDialogue,
    ctx: &AppContext,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    match button {
        MenuButton::Help => return start::handle_help(bot, msg, ctx).await,
        MenuButton::MainMenu => return start::show_menu(bot, msg, ctx).await,
        _ => {}
    }

    let user = ctx.load_user(user_id).await?;
    if !permitted(button, user_id, user.as_ref(), ctx) {
        log_permission_denied(button.label(), user_id);
        CommandFeedback::new(bot.clone(), chat_id)
            .error("You don't have access to this feature.")
            .await?;
        return Ok(());
    }
    let Some(user) = user else {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("Press /start first.")
            .await?;
        return Ok(());
    };

    match button {
        MenuButton::MyLessons => student::my_lessons(bot, chat_id, user_id, ctx).await,
        MenuButton::MyHomework => student::my_homework(bot, chat_id, user_id, ctx).await,
        MenuButton::MyTutor => student::my_tutor(bot, chat_id, &user, ctx).await,

        MenuButton::Profile => profile::show_profile(bot, chat_id, user_id, ctx).await,
        MenuButton::MyStudents => profile::my_students(bot, chat_id, user_id, ctx).await,
        MenuButton::AssignHomework => homework::start_assign(bot, chat_id, user_id, dialogue, ctx).await,
        MenuButton::Submissions => homework::list_submissions(bot, chat_id, user_id, ctx).await,
        MenuButton::Schedule => lessons::show_schedule(bot, chat_id, user_id, ctx).await,
        MenuButton::AddLesson => lessons::start_add_lesson(bot, chat_id, user_id, dialogue, ctx).await,
        MenuButton::WeeklySchedule => lessons::show_weekly_schedule(bot, chat_id, user_id, ctx).await,
        MenuButton::FreeSlots => availability::list_slots(bot, chat_id, user_id, ctx).await,
        MenuButton::Vacations => availability::list_vacations(bot, chat_id, user_id, ctx).await,
        MenuButton::Requests => requests::list_requests(bot, chat_id, user_id, ctx).await,
        MenuButton::Statistics => stats::tutor_stats(bot, chat_id, user_id, ctx).await,

        MenuButton::AddTutor => superadmin::start_add_tutor(bot, chat_id, dialogue).await,
        MenuButton::RemoveTutor => superadmin::choose_tutor_to_remove(bot, chat_id, ctx).await,
        MenuButton::ManageRoles => superadmin::start_change_role(bot, chat_id, dialogue).await,
        MenuButton::SystemStats => stats::system_stats(bot, chat_id, ctx).await,
        MenuButton::TutorList => superadmin::tutor_list(bot, chat_id, ctx).await,

        MenuButton::Help | MenuButton::MainMenu | MenuButton::Cancel => Ok(()),
    }
}
