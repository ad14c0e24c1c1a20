//! Two-step subscription flow: `/start` asks for a name, the next text
//! message from the same chat is stored as that name.
//!
//! The teloxide dispatcher handles updates of one chat sequentially and
//! different chats concurrently, so reads and writes of a chat's state never
//! interleave.

use teloxide::types::ChatId;

use crate::{
    database::connection::SubscriberStore,
    keyboard::Keyboard,
    messages::Notice,
    quote::QuoteSource,
    scheduler::DeliveryTime,
    state::OnboardingState,
    transport::Messenger,
    HandlerResult, UserDialogue,
};

pub async fn start<M: Messenger>(messenger: &M, dialogue: &UserDialogue) -> HandlerResult {
    dialogue.update(OnboardingState::WaitingForName).await?;
    messenger
        .send_text(dialogue.chat_id(), &Notice::Welcome.to_string(), Keyboard::Keep)
        .await?;
    Ok(())
}

/// Handles free text. Only chats waiting for a name get an answer; any other
/// text is dropped without a reply.
pub async fn receive_name<S, M, Q>(
    store: &S,
    messenger: &M,
    quotes: &Q,
    dialogue: &UserDialogue,
    delivery: &DeliveryTime,
    name: &str,
) -> HandlerResult
where
    S: SubscriberStore,
    M: Messenger,
    Q: QuoteSource,
{
    let chat_id = dialogue.chat_id();

    match dialogue.get().await? {
        Some(OnboardingState::WaitingForName) => {}
        None => {
            tracing::debug!("Ignoring text from chat {} outside onboarding", chat_id.0);
            return Ok(());
        }
    }

    if let Err(e) = store.upsert_subscriber(chat_id, name).await {
        tracing::error!("Failed to save subscriber {}: {e}", chat_id.0);
        messenger
            .send_text(chat_id, &Notice::SaveFailed.to_string(), Keyboard::Keep)
            .await?;
        return Ok(());
    }

    dialogue.exit().await?;
    tracing::info!("New subscriber: {name} ({})", chat_id.0);

    let confirmation = Notice::Subscribed {
        name: name.to_owned(),
        delivery: delivery.to_string(),
    };
    messenger
        .send_text(chat_id, &confirmation.to_string(), Keyboard::QuickQuote)
        .await?;

    send_quote(messenger, quotes, chat_id).await
}

/// Deactivates the subscriber. Works whether or not the chat is onboarding
/// and leaves its onboarding state alone.
pub async fn unsubscribe<S, M>(store: &S, messenger: &M, chat_id: ChatId) -> HandlerResult
where
    S: SubscriberStore,
    M: Messenger,
{
    match store.set_active(chat_id, false).await {
        Ok(()) => {
            tracing::info!("User unsubscribed: {}", chat_id.0);
            messenger
                .send_text(chat_id, &Notice::Unsubscribed.to_string(), Keyboard::Remove)
                .await?;
        }
        Err(e) => {
            tracing::error!("Error unsubscribing {}: {e}", chat_id.0);
            messenger
                .send_text(chat_id, &Notice::SomethingWentWrong.to_string(), Keyboard::Keep)
                .await?;
        }
    }
    Ok(())
}

pub async fn send_quote<M, Q>(messenger: &M, quotes: &Q, chat_id: ChatId) -> HandlerResult
where
    M: Messenger,
    Q: QuoteSource,
{
    // The typing indicator is cosmetic, a failure only gets logged.
    if let Err(e) = messenger.send_typing(chat_id).await {
        tracing::debug!("Typing indicator for {} failed: {e}", chat_id.0);
    }

    let quote = quotes.fetch_quote().await;
    messenger.send_text(chat_id, &quote, Keyboard::Keep).await?;
    Ok(())
}
