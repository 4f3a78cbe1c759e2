use teloxide::prelude::*;
use teloxide::types::{KeyboardRemove, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html::escape;

use super::Command;
use crate::bot::context::AppContext;
use crate::bot::dialogue::{reset as reset_dialogue, BotDialogue, State};
use crate::bot::handlers::HandlerResult;
use crate::bot::keyboards::{main_menu, tutor_choice};
use crate::database::models::{NewTutor, RequestStatus, StudentRequest, Tutor, User, DEFAULT_LESSON_COST};
use crate::services::registration::{self, BeginOutcome};
use crate::services::roles::Role;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::log_system_event;

/// `/start`: greet known users, auto-provision configured staff, and start
/// registration for everyone else.
pub async fn handle_start(bot: &Bot, msg: &Message, dialogue: &BotDialogue, ctx: &AppContext) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    dialogue.update(State::Idle).await?;

    if let Some(user) = provision_staff(ctx, user_id, from).await? {
        return send_welcome(bot, msg.chat.id, ctx, &user).await;
    }

    match registration::begin(&ctx.db.pool, user_id).await? {
        BeginOutcome::AlreadyRegistered(user) => send_welcome(bot, msg.chat.id, ctx, &user).await,
        BeginOutcome::Started(state) => {
            let tutors = Tutor::list_active(&ctx.db.pool).await?;
            if tutors.is_empty() {
                CommandFeedback::new(bot.clone(), msg.chat.id)
                    .info("There are no tutors available yet. Please try again later.")
                    .await?;
                return Ok(());
            }

            bot.send_message(
                msg.chat.id,
                format!(
                    "👋 Hello, {}!\n\nThis bot connects students with their tutors. \
                     Let's get you registered.",
                    escape(&from.first_name)
                ),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(KeyboardRemove::new())
            .await?;

            bot.send_message(msg.chat.id, state.prompt())
                .reply_markup(tutor_choice(&tutors))
                .await?;
            dialogue.update(State::Registration(state)).await?;
            Ok(())
        }
    }
}

/// Configured superadmins and special tutors get a user row and a tutor
/// profile on their first `/start`.
async fn provision_staff(
    ctx: &AppContext,
    user_id: i64,
    from: &teloxide::types::User,
) -> Result<Option<User>, sqlx::Error> {
    let role = if ctx.roles.is_configured_superadmin(user_id) {
        Role::Superadmin
    } else {
        match ctx.roles.primary_role(user_id) {
            r @ (Role::Admin | Role::Superadmin) => r,
            _ => return Ok(None),
        }
    };

    let existing = ctx.load_user(user_id).await?;
    if existing.as_ref().is_some_and(|u| u.role().is_tutor()) {
        return Ok(existing);
    }

    let name = from.full_name();
    let mut tx = ctx.db.pool.begin().await?;
    let user = User::upsert_with_role(&mut *tx, user_id, from.username.as_deref(), &name, role).await?;
    let has_profile: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tutors WHERE id = ?")
        .bind(user_id)
        .fetch_one(&mut tx)
        .await?;
    if has_profile == 0 {
        Tutor::upsert(
            &mut *tx,
            &NewTutor {
                id: user_id,
                name,
                username: from.username.clone(),
                subjects: "All subjects".to_string(),
                cost: DEFAULT_LESSON_COST,
                link: None,
            },
        )
        .await?;
    }
    tx.commit().await?;

    log_system_event("Provisioned staff account", Some(&format!("{} as {}", user_id, role)));
    Ok(Some(user))
}

async fn send_welcome(bot: &Bot, chat_id: ChatId, ctx: &AppContext, user: &User) -> HandlerResult {
    let role = ctx.menu_role(user.id, Some(user));
    let name = escape(&user.display_name());

    let mut text = match role {
        Role::Archived => {
            bot.send_message(
                chat_id,
                "🗄 Your account is archived. Please contact the administrator.",
            )
            .reply_markup(KeyboardRemove::new())
            .await?;
            return Ok(());
        }
        Role::Superadmin => format!("👑 Welcome, {name}! You have full access."),
        Role::Admin => format!("👨‍🏫 Welcome, {name}! Your tutor menu is below."),
        Role::Student | Role::Unregistered => {
            let pending = StudentRequest::for_student(&ctx.db.pool, user.id)
                .await?
                .first()
                .is_some_and(|r| r.status() == RequestStatus::Pending);
            if pending {
                format!("⏳ Welcome back, {name}! Your request is waiting for the tutor's approval.")
            } else {
                format!("🎓 Welcome back, {name}!")
            }
        }
    };

    let switchable = ctx.roles.available_roles(user.id);
    if switchable.len() > 1 {
        text.push_str("\n\nYou can switch menus:");
        for role in switchable {
            let command = match role {
                Role::Student => "/student",
                Role::Admin => "/admin",
                Role::Superadmin => "/superadmin",
                _ => continue,
            };
            text.push_str(&format!("\n• {} {}", command, role.label()));
        }
    }

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(main_menu(role))
        .await?;
    Ok(())
}

pub async fn show_menu(bot: &Bot, msg: &Message, ctx: &AppContext) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    let user = ctx.load_user(user_id).await?;
    let role = ctx.menu_role(user_id, user.as_ref());

    if matches!(role, Role::Unregistered | Role::Archived) {
        CommandFeedback::new(bot.clone(), msg.chat.id)
            .info("Press /start to register first.")
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, "🏠 Main menu")
        .reply_markup(main_menu(role))
        .await?;
    Ok(())
}

/// `/admin`, `/superadmin`, `/student`: show another role's menu to users
/// allowed to act in it.
pub async fn switch_menu(bot: &Bot, msg: &Message, ctx: &AppContext, role: Role) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    let user = ctx.load_user(user_id).await?;
    let stored = user.as_ref().map(User::role);

    if user.is_none() || !ctx.roles.can_switch_to(user_id, role, stored) {
        CommandFeedback::new(bot.clone(), msg.chat.id)
            .error("You don't have access to this menu.")
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, format!("🔄 Switched to {}", role.label()))
        .reply_markup(main_menu(role))
        .await?;
    Ok(())
}

pub async fn handle_help(bot: &Bot, msg: &Message, ctx: &AppContext) -> HandlerResult {
    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or_default();
    let user = ctx.load_user(user_id).await?;
    let role = ctx.menu_role(user_id, user.as_ref());

    let guide = match role {
        Role::Superadmin => {
            "👑 As a superadmin you can add and remove tutors, change user roles \
             and see system statistics, in addition to all tutor features."
        }
        Role::Admin => {
            "👨‍🏫 Use the menu to schedule lessons, assign and check homework, \
             manage free slots and vacations, and approve student requests."
        }
        Role::Student => {
            "🎓 Use the menu to see your lessons and homework, submit answers \
             and contact your tutor."
        }
        Role::Archived | Role::Unregistered => "Press /start to register with a tutor.",
    };

    bot.send_message(
        msg.chat.id,
        format!("{}\n\n{}\n\nPress ❌ Cancel or /cancel to leave any step.", Command::descriptions(), guide),
    )
    .await?;
    Ok(())
}

/// Drops whatever the dialogue collected and returns to the menu.
pub async fn cancel(bot: &Bot, chat_id: ChatId, user_id: i64, dialogue: &BotDialogue, ctx: &AppContext) -> HandlerResult {
    let was_idle = !reset_dialogue(dialogue).await?;

    let user = ctx.load_user(user_id).await?;
    let role = ctx.menu_role(user_id, user.as_ref());
    let text = if was_idle { "Nothing to cancel." } else { "❌ Cancelled." };

    if matches!(role, Role::Unregistered | Role::Archived) {
        bot.send_message(chat_id, format!("{text} Press /start to begin again."))
            .reply_markup(KeyboardRemove::new())
            .await?;
    } else {
        bot.send_message(chat_id, text)
            .reply_markup(main_menu(role))
            .await?;
    }
    Ok(())
}
