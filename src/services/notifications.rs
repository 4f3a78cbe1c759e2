use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use teloxide::utils::html::escape;

use crate::bot::callback_data::CallbackAction;
use crate::database::models::{ContentType, Homework, Lesson, Tutor, User};
use crate::services::roles::Role;
use crate::utils::datetime::format_lesson_time;
use crate::utils::logging::log_notification_failure;

/// Outbound transport for notifications.
///
/// Implementations never fail loudly: a failed send is logged and reported
/// as `false`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, user_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> bool;

    async fn send_media(
        &self,
        user_id: i64,
        content_type: ContentType,
        file_id: &str,
        caption: Option<&str>,
    ) -> bool;
}

/// Sends notifications through the Telegram Bot API.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, user_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> bool {
        let mut request = self
            .bot
            .send_message(ChatId(user_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }

        match request.await {
            Ok(_) => true,
            Err(e) => {
                log_notification_failure("text", user_id, &e.to_string());
                false
            }
        }
    }

    async fn send_media(
        &self,
        user_id: i64,
        content_type: ContentType,
        file_id: &str,
        caption: Option<&str>,
    ) -> bool {
        let chat = ChatId(user_id);
        let file = InputFile::file_id(file_id);
        let caption = caption.map(str::to_string);

        let result = match content_type {
            ContentType::Text => {
                self.bot
                    .send_message(chat, escape(file_id))
                    .parse_mode(ParseMode::Html)
                    .await
            }
            ContentType::Photo => {
                let mut request = self.bot.send_photo(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await
            }
            ContentType::File => {
                let mut request = self.bot.send_document(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await
            }
            ContentType::Voice => {
                let mut request = self.bot.send_voice(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await
            }
            ContentType::Video => {
                let mut request = self.bot.send_video(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await
            }
        };

        match result {
            Ok(_) => true,
            Err(e) => {
                log_notification_failure(content_type.as_str(), user_id, &e.to_string());
                false
            }
        }
    }
}

/// Templated, fire-and-forget notifications.
#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Tell a tutor about a new student request, with approve/reject buttons.
    pub async fn new_request(&self, tutor_id: i64, student: &User, request_id: i64) -> bool {
        let text = format!(
            "📥 <b>New student request</b>\n\n\
             👤 Name: {}\n\
             🎂 Age: {}\n\
             🌍 Timezone: {}\n\
             📚 Subject: {}\n\
             🔗 Username: {}",
            escape(&student.display_name()),
            student.age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
            escape(student.timezone.as_deref().unwrap_or("-")),
            escape(student.subject.as_deref().unwrap_or("-")),
            student
                .username
                .as_deref()
                .map(|u| format!("@{}", escape(u)))
                .unwrap_or_else(|| "-".to_string()),
        );
        let keyboard = InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::callback("✅ Approve", CallbackAction::ApproveRequest(request_id).encode()),
            InlineKeyboardButton::callback("❌ Reject", CallbackAction::RejectRequest(request_id).encode()),
        ]]);
        self.notifier.send_text(tutor_id, &text, Some(keyboard)).await
    }

    pub async fn request_approved(&self, student_id: i64, tutor: &Tutor) -> bool {
        let mut text = format!(
            "🎉 <b>Your request was approved!</b>\n\nTutor: {}",
            escape(&tutor.name)
        );
        if let Some(link) = &tutor.link {
            text.push_str(&format!("\nLesson link: {}", escape(link)));
        }
        text.push_str("\n\nPress /start to open your menu.");
        self.notifier.send_text(student_id, &text, None).await
    }

    pub async fn request_rejected(&self, student_id: i64, tutor_name: &str) -> bool {
        let text = format!(
            "😔 Your request to {} was declined.\n\nYou can press /start and choose another tutor.",
            escape(tutor_name)
        );
        self.notifier.send_text(student_id, &text, None).await
    }

    pub async fn lesson_added(&self, lesson: &Lesson, tutor_name: &str) -> bool {
        let text = format!(
            "📅 <b>New lesson scheduled</b>\n\n🕐 {}\n👨‍🏫 {}{}",
            format_lesson_time(&lesson.lesson_date, &lesson.lesson_time),
            escape(tutor_name),
            subject_line(lesson),
        );
        self.notifier.send_text(lesson.student_id, &text, None).await
    }

    pub async fn lesson_cancelled(&self, lesson: &Lesson) -> bool {
        let text = format!(
            "❌ <b>Lesson cancelled</b>\n\nThe lesson on {} will not take place.",
            format_lesson_time(&lesson.lesson_date, &lesson.lesson_time),
        );
        self.notifier.send_text(lesson.student_id, &text, None).await
    }

    pub async fn lesson_rescheduled(&self, lesson: &Lesson, old_date: &str, old_time: &str) -> bool {
        let text = format!(
            "🔁 <b>Lesson moved</b>\n\nFrom: {}\nTo: {}",
            format_lesson_time(old_date, old_time),
            format_lesson_time(&lesson.lesson_date, &lesson.lesson_time),
        );
        self.notifier.send_text(lesson.student_id, &text, None).await
    }

    pub async fn lesson_completed(&self, lesson: &Lesson) -> bool {
        let text = format!(
            "✅ Lesson on {} marked as completed. Thank you!",
            format_lesson_time(&lesson.lesson_date, &lesson.lesson_time),
        );
        self.notifier.send_text(lesson.student_id, &text, None).await
    }

    /// Reminder that a lesson starts soon, sent to one participant.
    pub async fn lesson_reminder(&self, user_id: i64, lesson: &Lesson, with_name: &str) -> bool {
        let text = format!(
            "⏰ <b>Lesson soon</b>\n\n🕐 {}\n👥 With: {}{}",
            format_lesson_time(&lesson.lesson_date, &lesson.lesson_time),
            escape(with_name),
            subject_line(lesson),
        );
        self.notifier.send_text(user_id, &text, None).await
    }

    /// Text homework is sent inline. Media is forwarded by file id after the
    /// heading, and counts as delivered only if both sends succeed.
    pub async fn homework_assigned(&self, homework: &Homework, tutor_name: &str) -> bool {
        let mut text = format!(
            "📚 <b>New homework</b> from {}\n",
            escape(tutor_name)
        );
        if let Some(description) = &homework.description {
            text.push_str(&format!("\n{}\n", escape(description)));
        }

        match homework.content_type() {
            ContentType::Text => {
                text.push_str(&format!("\n{}", escape(&homework.content_data)));
                self.notifier.send_text(homework.student_id, &text, Some(submit_keyboard(homework.id))).await
            }
            media => {
                let heading = self.notifier.send_text(homework.student_id, &text, None).await;
                let body = self
                    .notifier
                    .send_media(homework.student_id, media, &homework.content_data, None)
                    .await;
                let keyboard = self
                    .notifier
                    .send_text(
                        homework.student_id,
                        "Send your answer when ready:",
                        Some(submit_keyboard(homework.id)),
                    )
                    .await;
                heading && body && keyboard
            }
        }
    }

    pub async fn homework_submitted(&self, homework: &Homework, student_name: &str) -> bool {
        let text = format!(
            "📤 <b>Homework submitted</b>\n\n👤 {}\n📝 {}",
            escape(student_name),
            escape(&homework.title()),
        );
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "✅ Mark as checked",
            CallbackAction::HomeworkChecked(homework.id).encode(),
        )]]);

        match (homework.submission_type(), homework.submission_data.as_deref()) {
            (Some(ContentType::Text), Some(answer)) => {
                let text = format!("{}\n\n<b>Answer:</b>\n{}", text, escape(answer));
                self.notifier.send_text(homework.tutor_id, &text, Some(keyboard)).await
            }
            (Some(media), Some(file_id)) => {
                let body = self.notifier.send_media(homework.tutor_id, media, file_id, None).await;
                let heading = self.notifier.send_text(homework.tutor_id, &text, Some(keyboard)).await;
                body && heading
            }
            _ => self.notifier.send_text(homework.tutor_id, &text, Some(keyboard)).await,
        }
    }

    pub async fn homework_checked(&self, homework: &Homework) -> bool {
        let text = format!(
            "✅ Your homework \"{}\" has been checked.",
            escape(&homework.title())
        );
        self.notifier.send_text(homework.student_id, &text, None).await
    }

    pub async fn homework_reminder(&self, homework: &Homework) -> bool {
        let text = format!(
            "⏰ <b>Homework reminder</b>\n\n📝 {}\n\nDon't forget to submit it!",
            escape(&homework.title())
        );
        self.notifier
            .send_text(homework.student_id, &text, Some(submit_keyboard(homework.id)))
            .await
    }

    /// Sends stored homework content again, e.g. when an assignment is opened.
    pub async fn resend_media(&self, user_id: i64, content_type: ContentType, file_id: &str) -> bool {
        self.notifier.send_media(user_id, content_type, file_id, None).await
    }

    pub async fn direct_message(&self, recipient_id: i64, sender_name: &str, content: &str) -> bool {
        let text = format!(
            "✉️ <b>Message from {}</b>\n\n{}",
            escape(sender_name),
            escape(content)
        );
        self.notifier.send_text(recipient_id, &text, None).await
    }

    pub async fn role_changed(&self, user_id: i64, role: Role) -> bool {
        let text = format!(
            "🔄 Your role was changed to <b>{}</b>. Press /start to refresh your menu.",
            escape(role.label())
        );
        self.notifier.send_text(user_id, &text, None).await
    }
}

fn subject_line(lesson: &Lesson) -> String {
    lesson
        .subject
        .as_deref()
        .map(|s| format!("\n📚 {}", escape(s)))
        .unwrap_or_default()
}

fn submit_keyboard(homework_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "📤 Submit",
        CallbackAction::SubmitHomework(homework_id).encode(),
    )]])
}
