pub mod callback;
pub mod general_message;
pub mod message;

use teloxide::{
    dispatching::{
        dialogue::{self, InMemStorage},
        UpdateHandler,
    },
    prelude::*,
};

use crate::bot::commands::{callback_chat, Command};
use crate::bot::context::AppContext;
use crate::bot::dialogue::{BotDialogue, State};
use crate::utils::feedback::CommandFeedback;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub struct BotHandler {
    pub ctx: AppContext,
}

impl BotHandler {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        let ctx_command = self.ctx.clone();
        let ctx_message = self.ctx.clone();
        let ctx_callback = self.ctx.clone();

        dialogue::enter::<Update, InMemStorage<State>, State, _>()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command, dialogue: BotDialogue| {
                        let ctx = ctx_command.clone();
                        async move {
                            let result = message::command_handler(&bot, &msg, cmd, &dialogue, &ctx).await;
                            finish(&bot, msg.chat.id, result).await
                        }
                    }),
            )
            .branch(Update::filter_message().endpoint(
                move |bot: Bot, msg: Message, dialogue: BotDialogue, state: State| {
                    let ctx = ctx_message.clone();
                    async move {
                        let result = message::message_handler(&bot, &msg, &dialogue, state, &ctx).await;
                        finish(&bot, msg.chat.id, result).await
                    }
                },
            ))
            .branch(Update::filter_callback_query().endpoint(
                move |bot: Bot, q: CallbackQuery, dialogue: BotDialogue, state: State| {
                    let ctx = ctx_callback.clone();
                    async move {
                        let result = callback::callback_handler(&bot, &q, &dialogue, state, &ctx).await;
                        finish(&bot, callback_chat(&q), result).await
                    }
                },
            ))
    }
}

/// Handler boundary. Storage and dialogue failures are logged and shown to
/// the user as a generic error; Telegram transport errors go on to the
/// dispatcher's error handler.
pub async fn finish(bot: &Bot, chat_id: ChatId, result: HandlerResult) -> HandlerResult {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is::<teloxide::RequestError>() => Err(e),
        Err(e) => {
            tracing::error!("Handler failed in chat {}: {}", chat_id, e);
            CommandFeedback::new(bot.clone(), chat_id).internal_error().await?;
            Ok(())
        }
    }
}
