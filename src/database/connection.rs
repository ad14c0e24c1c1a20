use std::{borrow::Cow, future::Future};

use sqlx::postgres::PgPool;
use teloxide::types::ChatId;

use crate::error::StoreError;

pub struct Connection {
    pool: PgPool,
}

impl Connection {
    pub async fn connect<'a>(connection_string: Cow<'a, str>) -> Result<Self, StoreError> {
        let pool = PgPool::connect(&connection_string).await?;
        Ok(Self { pool })
    }

    pub async fn perform_migrations(&self) -> Result<(), StoreError> {
        tracing::debug!("Applying migrations");
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

/// Persistence the bot needs for its subscribers. Every call is a single
/// statement; nothing is retried.
pub trait SubscriberStore {
    /// Inserts the subscriber or refreshes its name, marking it active.
    fn upsert_subscriber(
        &self,
        chat_id: ChatId,
        first_name: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set_active(
        &self,
        chat_id: ChatId,
        active: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn active_subscribers(&self) -> impl Future<Output = Result<Vec<ChatId>, StoreError>> + Send;
}

impl SubscriberStore for Connection {
    async fn upsert_subscriber(&self, chat_id: ChatId, first_name: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO subscribers (chat_id, first_name, is_active) VALUES ($1, $2, TRUE) \
             ON CONFLICT (chat_id) DO UPDATE \
             SET first_name = EXCLUDED.first_name, is_active = TRUE, updated_at = NOW()",
        )
        .bind(chat_id.0)
        .bind(first_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_active(&self, chat_id: ChatId, active: bool) -> Result<(), StoreError> {
        sqlx::query("UPDATE subscribers SET is_active = $1, updated_at = NOW() WHERE chat_id = $2")
            .bind(active)
            .bind(chat_id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn active_subscribers(&self) -> Result<Vec<ChatId>, StoreError> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT chat_id FROM subscribers WHERE is_active = TRUE")
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(ChatId).collect())
    }
}
