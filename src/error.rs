use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} should be set.")]
    Missing(&'static str),

    #[error("{key} can't be parsed: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Outcome of a failed outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The recipient can no longer be reached (Telegram answered 403).
    #[error("recipient blocked the bot: {0}")]
    Blocked(String),

    #[error("{0}")]
    Other(String),
}

impl SendError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, SendError::Blocked(_))
    }
}
