use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::context::AppContext;
use crate::bot::handlers::HandlerResult;
use crate::database::models::{SystemStats, TutorStats};

fn percent(part: i64, total: i64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

pub fn format_tutor_stats(stats: &TutorStats) -> String {
    let finished = stats.completed_lessons + stats.cancelled_lessons;
    let mut text = String::from("📊 <b>Your statistics</b>\n\n");

    text.push_str(&format!(
        "👥 <b>Students:</b> {}\n\
         📥 Pending requests: {}\n\n",
        stats.active_students, stats.pending_requests
    ));
    text.push_str(&format!(
        "📅 <b>Lessons:</b>\n\
         • Scheduled: {}\n\
         • Completed: {} ({:.1}%)\n\
         • Cancelled: {}\n\n",
        stats.scheduled_lessons,
        stats.completed_lessons,
        percent(stats.completed_lessons, finished),
        stats.cancelled_lessons
    ));
    text.push_str(&format!(
        "📚 <b>Homework:</b>\n\
         • Waiting for the student: {}\n\
         • Waiting for your check: {}\n\
         • Checked: {}\n\n",
        stats.homework_assigned, stats.homework_submitted, stats.homework_checked
    ));
    text.push_str(&format!("💰 <b>Revenue:</b> {}", stats.revenue));
    text
}

pub fn format_system_stats(stats: &SystemStats) -> String {
    let mut text = String::from("📈 <b>System statistics</b>\n\n");

    text.push_str(&format!(
        "👥 <b>Users:</b> {}\n\
         • Students: {}\n\
         • Tutors: {}\n\
         • Superadmins: {}\n\
         • Archived: {}\n\n",
        stats.total_users, stats.students, stats.tutors, stats.superadmins, stats.archived
    ));
    text.push_str(&format!(
        "📅 <b>Lessons:</b> {}\n\
         • Completed: {} ({:.1}%)\n\
         • Upcoming: {}\n\n",
        stats.total_lessons,
        stats.completed_lessons,
        percent(stats.completed_lessons, stats.total_lessons),
        stats.scheduled_lessons
    ));
    text.push_str(&format!(
        "📚 <b>Homework:</b> {} assigned, {} submitted\n\
         ✉️ <b>Messages:</b> {}\n\
         📥 <b>Pending requests:</b> {}\n\
         💰 <b>Revenue:</b> {}\n\n\
         🕐 {}",
        stats.homework_assigned,
        stats.homework_submitted,
        stats.total_messages,
        stats.pending_requests,
        stats.total_revenue,
        stats.updated_at
    ));
    text
}

pub async fn tutor_stats(bot: &Bot, chat_id: ChatId, tutor_id: i64, ctx: &AppContext) -> HandlerResult {
    let stats = TutorStats::collect(&ctx.db.pool, tutor_id).await?;
    bot.send_message(chat_id, format_tutor_stats(&stats))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn system_stats(bot: &Bot, chat_id: ChatId, ctx: &AppContext) -> HandlerResult {
    let stats = SystemStats::collect(&ctx.db.pool).await?;
    bot.send_message(chat_id, format_system_stats(&stats))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_handles_zero_total() {
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn test_tutor_stats_text() {
        let stats = TutorStats {
            active_students: 3,
            completed_lessons: 3,
            cancelled_lessons: 1,
            revenue: 4500,
            ..Default::default()
        };
        let text = format_tutor_stats(&stats);
        assert!(text.contains("<b>Students:</b> 3"));
        assert!(text.contains("Completed: 3 (75.0%)"));
        assert!(text.contains("<b>Revenue:</b> 4500"));
    }
}
