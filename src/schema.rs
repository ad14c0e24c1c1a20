use std::{future::Future, sync::Arc};

use teloxide::{
    dispatching::{MessageFilterExt, UpdateFilterExt, UpdateHandler},
    dptree,
    prelude::*,
    types::{ChatId, Message, Update},
    Bot,
};
use tracing::instrument;

use crate::{
    commands::{help_text, Command},
    database::connection::{Connection, SubscriberStore},
    keyboard::Keyboard,
    messages::{Notice, QUOTE_BUTTON},
    onboarding,
    quote::{QuoteSource, ZenQuotes},
    scheduler::DeliveryTime,
    state::OnboardingStorage,
    transport::Messenger,
    HandlerResult, UserDialogue,
};

type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn schema() -> UpdateHandler<HandlerError> {
    routes::<Connection, Bot, ZenQuotes>()
}

/// Commands win over everything, then the quick-action button, then free
/// text for name capture. Other messages fall through unhandled.
pub(crate) fn routes<S, M, Q>() -> UpdateHandler<HandlerError>
where
    S: SubscriberStore + Send + Sync + 'static,
    M: Messenger + Clone + Send + Sync + 'static,
    Q: QuoteSource + Send + Sync + 'static,
{
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start::<M>))
        .branch(case![Command::Stop].endpoint(stop::<S, M>))
        .branch(case![Command::Quote].endpoint(quote::<M, Q>))
        .branch(case![Command::Help].endpoint(help::<M>));

    let quote_button = dptree::filter(is_quote_button).endpoint(quote::<M, Q>);

    Update::filter_message()
        .map(|storage: Arc<OnboardingStorage>, msg: Message| UserDialogue::new(storage, msg.chat.id))
        .branch(command_handler)
        .branch(quote_button)
        .branch(Message::filter_text().endpoint(receive_name::<S, M, Q>))
}

fn is_quote_button(msg: Message) -> bool {
    msg.text() == Some(QUOTE_BUTTON)
}

/// Runs a handler to completion. A failure is logged and answered with a
/// generic apology so a single update can never take the bot down.
async fn guarded<M: Messenger>(
    messenger: &M,
    chat_id: ChatId,
    work: impl Future<Output = HandlerResult> + Send,
) -> HandlerResult {
    if let Err(e) = work.await {
        tracing::error!("Handler failed for chat {}: {e}", chat_id.0);
        let apology = Notice::SomethingWentWrong.to_string();
        if let Err(e) = messenger.send_text(chat_id, &apology, Keyboard::Keep).await {
            tracing::warn!("Could not report failure to chat {}: {e}", chat_id.0);
        }
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn start<M: Messenger + Sync>(messenger: M, dialogue: UserDialogue) -> HandlerResult {
    guarded(&messenger, dialogue.chat_id(), onboarding::start(&messenger, &dialogue)).await
}

#[instrument(level = "info", skip_all)]
async fn stop<S, M>(messenger: M, msg: Message, connection: Arc<S>) -> HandlerResult
where
    S: SubscriberStore + Send + Sync,
    M: Messenger + Sync,
{
    guarded(
        &messenger,
        msg.chat.id,
        onboarding::unsubscribe(connection.as_ref(), &messenger, msg.chat.id),
    )
    .await
}

#[instrument(level = "info", skip_all)]
async fn quote<M, Q>(messenger: M, msg: Message, quotes: Arc<Q>) -> HandlerResult
where
    M: Messenger + Sync,
    Q: QuoteSource + Send + Sync,
{
    guarded(
        &messenger,
        msg.chat.id,
        onboarding::send_quote(&messenger, quotes.as_ref(), msg.chat.id),
    )
    .await
}

async fn help<M: Messenger + Sync>(messenger: M, msg: Message) -> HandlerResult {
    let work = async {
        messenger.send_text(msg.chat.id, &help_text(), Keyboard::Keep).await?;
        HandlerResult::Ok(())
    };
    guarded(&messenger, msg.chat.id, work).await
}

#[instrument(level = "debug", skip_all)]
async fn receive_name<S, M, Q>(
    messenger: M,
    dialogue: UserDialogue,
    text: String,
    connection: Arc<S>,
    quotes: Arc<Q>,
    delivery: DeliveryTime,
) -> HandlerResult
where
    S: SubscriberStore + Send + Sync,
    M: Messenger + Sync,
    Q: QuoteSource + Send + Sync,
{
    guarded(
        &messenger,
        dialogue.chat_id(),
        onboarding::receive_name(
            connection.as_ref(),
            &messenger,
            quotes.as_ref(),
            &dialogue,
            &delivery,
            &text,
        ),
    )
    .await
}
