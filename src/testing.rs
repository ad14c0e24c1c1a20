use std::{collections::HashSet, str::FromStr, sync::{Arc, Mutex}};

use chrono::{TimeZone, Utc};
use cron::Schedule;
use teloxide::types::ChatId;
use tokio::time::Instant;

use crate::{
    config::{DEFAULT_BROADCAST_CRON, DEFAULT_BROADCAST_UTC_OFFSET},
    database::connection::SubscriberStore,
    error::{SendError, StoreError},
    keyboard::Keyboard,
    quote::QuoteSource,
    scheduler::DeliveryTime,
    transport::Messenger,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreCall {
    Upsert(ChatId, String),
    SetActive(ChatId, bool),
    QueryActive,
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub(crate) active: Vec<ChatId>,
    pub(crate) fail_upsert: bool,
    pub(crate) fail_query: bool,
    pub(crate) fail_set_active: bool,
    pub(crate) calls: Mutex<Vec<StoreCall>>,
}

impl FakeStore {
    pub(crate) fn with_active(active: &[i64]) -> Self {
        Self {
            active: active.iter().copied().map(ChatId).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn store_failure() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

impl SubscriberStore for FakeStore {
    async fn upsert_subscriber(&self, chat_id: ChatId, first_name: &str) -> Result<(), StoreError> {
        self.record(StoreCall::Upsert(chat_id, first_name.to_owned()));
        if self.fail_upsert {
            return Err(store_failure());
        }
        Ok(())
    }

    async fn set_active(&self, chat_id: ChatId, active: bool) -> Result<(), StoreError> {
        self.record(StoreCall::SetActive(chat_id, active));
        if self.fail_set_active {
            return Err(store_failure());
        }
        Ok(())
    }

    async fn active_subscribers(&self) -> Result<Vec<ChatId>, StoreError> {
        self.record(StoreCall::QueryActive);
        if self.fail_query {
            return Err(store_failure());
        }
        Ok(self.active.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sent {
    pub(crate) chat_id: ChatId,
    pub(crate) text: String,
    pub(crate) keyboard: Keyboard,
    pub(crate) at: Instant,
}

/// Records every outbound message. Chats listed in `blocked` answer like a
/// user who blocked the bot, chats in `broken` fail with some other error.
#[derive(Default)]
pub(crate) struct RecordingMessenger {
    pub(crate) blocked: HashSet<ChatId>,
    pub(crate) broken: HashSet<ChatId>,
    pub(crate) typing_fails: bool,
    pub(crate) sent: Mutex<Vec<Sent>>,
    pub(crate) typing: Mutex<Vec<ChatId>>,
}

impl RecordingMessenger {
    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.text).collect()
    }

    pub(crate) fn typing(&self) -> Vec<ChatId> {
        self.typing.lock().unwrap().clone()
    }
}

impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str, keyboard: Keyboard) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            text: text.to_owned(),
            keyboard,
            at: Instant::now(),
        });

        if self.blocked.contains(&chat_id) {
            return Err(SendError::Blocked("Forbidden: bot was blocked by the user".into()));
        }
        if self.broken.contains(&chat_id) {
            return Err(SendError::Other("Bad Request: chat not found".into()));
        }
        Ok(())
    }

    async fn send_typing(&self, chat_id: ChatId) -> Result<(), SendError> {
        self.typing.lock().unwrap().push(chat_id);
        if self.typing_fails {
            return Err(SendError::Other("Too Many Requests".into()));
        }
        Ok(())
    }
}

pub(crate) struct FixedQuote(pub(crate) &'static str);

impl QuoteSource for FixedQuote {
    async fn fetch_quote(&self) -> String {
        self.0.to_owned()
    }
}

/// Shared handle so routing tests can inspect what a dispatched handler sent.
impl Messenger for Arc<RecordingMessenger> {
    async fn send_text(&self, chat_id: ChatId, text: &str, keyboard: Keyboard) -> Result<(), SendError> {
        <RecordingMessenger as Messenger>::send_text(self, chat_id, text, keyboard).await
    }

    async fn send_typing(&self, chat_id: ChatId) -> Result<(), SendError> {
        <RecordingMessenger as Messenger>::send_typing(self, chat_id).await
    }
}

/// The default daily schedule, rendered as `8:00 AM (UTC+05:30)`.
pub(crate) fn delivery() -> DeliveryTime {
    let schedule = Schedule::from_str(DEFAULT_BROADCAST_CRON).unwrap();
    let offset = DEFAULT_BROADCAST_UTC_OFFSET.parse().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    DeliveryTime::new(&schedule, offset, now)
}
