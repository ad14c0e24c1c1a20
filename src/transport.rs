use std::future::Future;

use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{ChatAction, ChatId},
    ApiError, Bot, RequestError,
};

use crate::{error::SendError, keyboard::Keyboard};

/// Outbound side of the chat platform.
pub trait Messenger {
    fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Keyboard,
    ) -> impl Future<Output = Result<(), SendError>> + Send;

    fn send_typing(&self, chat_id: ChatId) -> impl Future<Output = Result<(), SendError>> + Send;
}

impl Messenger for Bot {
    async fn send_text(&self, chat_id: ChatId, text: &str, keyboard: Keyboard) -> Result<(), SendError> {
        let mut request = self.send_message(chat_id, text);
        if let Some(markup) = keyboard.markup() {
            request = request.reply_markup(markup);
        }
        request.await.map_err(classify)?;
        Ok(())
    }

    async fn send_typing(&self, chat_id: ChatId) -> Result<(), SendError> {
        self.send_chat_action(chat_id, ChatAction::Typing)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

/// Telegram answers 403 once a chat can no longer receive messages from the bot.
pub(crate) fn classify(err: RequestError) -> SendError {
    match err {
        RequestError::Api(api) if is_forbidden(&api) => SendError::Blocked(api.to_string()),
        other => SendError::Other(other.to_string()),
    }
}

fn is_forbidden(api: &ApiError) -> bool {
    match api {
        ApiError::BotBlocked
        | ApiError::UserDeactivated
        | ApiError::BotKicked
        | ApiError::CantInitiateConversation => true,
        // `Unknown` displays as `Unknown error: "..."`, so look at the raw description.
        ApiError::Unknown(description) => description.starts_with("Forbidden"),
        named => named.to_string().starts_with("Forbidden"),
    }
}
