use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use teloxide::utils::html::escape;

/// Shown whenever a storage call fails inside a handler.
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again later.";

/// Feedback types for different command outcomes
#[derive(Debug, Clone, Copy)]
pub enum FeedbackType {
    Success,
    Warning,
    Error,
    Info,
}

impl FeedbackType {
    fn emoji(&self) -> &'static str {
        match self {
            FeedbackType::Success => "✅",
            FeedbackType::Warning => "⚠️",
            FeedbackType::Error => "❌",
            FeedbackType::Info => "ℹ️",
        }
    }
}

/// Formats a one-line status message. The text is HTML-escaped.
pub fn format_feedback(feedback_type: FeedbackType, message: &str) -> String {
    format!("{} {}", feedback_type.emoji(), escape(message))
}

/// Centralized feedback for handler outcomes
pub struct CommandFeedback {
    bot: Bot,
    chat_id: ChatId,
}

impl CommandFeedback {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    pub async fn send(&self, feedback_type: FeedbackType, message: &str) -> ResponseResult<Message> {
        self.bot
            .send_message(self.chat_id, format_feedback(feedback_type, message))
            .parse_mode(ParseMode::Html)
            .await
    }

    /// Replace the text of a message sent earlier, e.g. after an inline button press.
    pub async fn update_message(
        &self,
        message_id: MessageId,
        feedback_type: FeedbackType,
        message: &str,
    ) -> ResponseResult<Message> {
        self.bot
            .edit_message_text(self.chat_id, message_id, format_feedback(feedback_type, message))
            .parse_mode(ParseMode::Html)
            .await
    }

    pub async fn success(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Success, message).await
    }

    pub async fn error(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Error, message).await
    }

    pub async fn warning(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Warning, message).await
    }

    pub async fn info(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Info, message).await
    }

    /// The generic storage-failure message.
    pub async fn internal_error(&self) -> ResponseResult<Message> {
        self.error(GENERIC_ERROR).await
    }

    /// Re-prompt after invalid input.
    pub async fn validation_error(&self, error: &str, suggestion: &str) -> ResponseResult<Message> {
        let text = format!(
            "{}\n\n💡 <b>Hint:</b> {}",
            format_feedback(FeedbackType::Error, error),
            escape(suggestion)
        );
        self.bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::Html)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_type_emojis() {
        assert_eq!(FeedbackType::Success.emoji(), "✅");
        assert_eq!(FeedbackType::Warning.emoji(), "⚠️");
        assert_eq!(FeedbackType::Error.emoji(), "❌");
        assert_eq!(FeedbackType::Info.emoji(), "ℹ️");
    }

    #[test]
    fn test_feedback_escapes_html() {
        assert_eq!(
            format_feedback(FeedbackType::Info, "a <b> & c"),
            "ℹ️ a &lt;b&gt; &amp; c"
        );
    }
}
