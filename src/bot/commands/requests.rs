use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html::escape;

use crate::bot::callback_data::CallbackAction;
use crate::bot::context::AppContext;
use crate::bot::handlers::HandlerResult;
use crate::database::models::{PendingRequest, RequestStatus, StudentRequest, Tutor, User};
use crate::services::roles::Role;
use crate::utils::feedback::{CommandFeedback, FeedbackType};
use crate::utils::logging::{log_command_success, log_permission_denied};

fn request_card(request: &PendingRequest) -> String {
    format!(
        "📥 <b>Request #{}</b>\n\n👤 {}\n🎂 {}\n🌍 {}\n📚 {}\n🔗 {}\n🕐 {}",
        request.id,
        escape(request.student_name.as_deref().unwrap_or("-")),
        request.age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
        escape(request.timezone.as_deref().unwrap_or("-")),
        escape(request.subject.as_deref().unwrap_or("-")),
        request
            .username
            .as_deref()
            .map(|u| format!("@{}", escape(u)))
            .unwrap_or_else(|| "-".to_string()),
        escape(&request.created_at),
    )
}

fn decision_keyboard(request_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Approve", CallbackAction::ApproveRequest(request_id).encode()),
        InlineKeyboardButton::callback("❌ Reject", CallbackAction::RejectRequest(request_id).encode()),
    ]])
}

/// Pending requests addressed to the tutor, one card each.
pub async fn list_requests(bot: &Bot, chat_id: ChatId, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let requests = StudentRequest::pending_for_tutor(&ctx.db.pool, tutor_id).await?;

    if requests.is_empty() {
        CommandFeedback::new(bot.clone(), chat_id)
            .info("No pending requests.")
            .await?;
        return Ok(());
    }

    for request in &requests {
        bot.send_message(chat_id, request_card(request))
            .parse_mode(ParseMode::Html)
            .reply_markup(decision_keyboard(request.id))
            .await?;
    }

    bot.send_message(chat_id, format!("{} pending request(s).", requests.len()))
        .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "🔄 Refresh",
            CallbackAction::RefreshRequests.encode(),
        )]]))
        .await?;
    Ok(())
}

/// Approve or reject a request from its inline buttons.
///
/// Rejection also moves the student back to `unregistered`, so they can
/// pick another tutor with `/start`.
pub async fn decide_request(
    bot: &Bot,
    q: &CallbackQuery,
    actor: Option<&User>,
    request_id: i64,
    approve: bool,
    ctx: &AppContext,
) -> HandlerResult {
    let actor_id = q.from.id.0 as i64;
    let Some(request) = StudentRequest::find_by_id(&ctx.db.pool, request_id).await? else {
        bot.answer_callback_query(q.id.clone()).text("Request not found.").await?;
        return Ok(());
    };

    if request.tutor_id != actor_id && !ctx.is_superadmin(actor_id, actor) {
        log_permission_denied("decide_request", actor_id);
        bot.answer_callback_query(q.id.clone())
            .text("This request is addressed to another tutor.")
            .await?;
        return Ok(());
    }

    let decided = if approve {
        StudentRequest::decide(&ctx.db.pool, request.id, RequestStatus::Accepted).await?
    } else {
        let mut tx = ctx.db.pool.begin().await?;
        let decided = StudentRequest::decide(&mut tx, request.id, RequestStatus::Rejected).await?;
        if decided {
            User::set_role(&mut tx, request.student_id, Role::Unregistered).await?;
        }
        tx.commit().await?;
        decided
    };

    if !decided {
        bot.answer_callback_query(q.id.clone())
            .text("This request was already decided.")
            .await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;

    let student_name = User::find_by_id(&ctx.db.pool, request.student_id)
        .await?
        .map(|u| u.display_name())
        .unwrap_or_else(|| format!("id {}", request.student_id));
    let tutor = Tutor::find_by_id(&ctx.db.pool, request.tutor_id).await?;

    let notified = match (&tutor, approve) {
        (Some(tutor), true) => ctx.notifications.request_approved(request.student_id, tutor).await,
        (Some(tutor), false) => ctx.notifications.request_rejected(request.student_id, &tutor.name).await,
        (None, true) => false,
        (None, false) => ctx.notifications.request_rejected(request.student_id, "the tutor").await,
    };

    let (feedback_type, verdict) = if approve {
        (FeedbackType::Success, "approved")
    } else {
        (FeedbackType::Warning, "rejected")
    };
    let mut text = format!("Request from {student_name} {verdict}.");
    if !notified {
        text.push_str(" The student could not be notified.");
    }

    if let Some(message) = &q.message {
        CommandFeedback::new(bot.clone(), message.chat.id)
            .update_message(message.id, feedback_type, &text)
            .await?;
    }

    log_command_success(
        if approve { "approve_request" } else { "reject_request" },
        &actor_id.to_string(),
        actor_id,
        Some(&format!("request {}", request.id)),
    );
    Ok(())
}
