use std::{str::FromStr, time::Duration};

use chrono::FixedOffset;
use cron::Schedule;
use tracing::Level;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_QUOTE_API_URL: &str = "https://zenquotes.io/api/random";
/// Every day at 08:00.
pub const DEFAULT_BROADCAST_CRON: &str = "0 0 8 * * *";
/// Asia/Kolkata, which has no daylight saving.
pub const DEFAULT_BROADCAST_UTC_OFFSET: &str = "+05:30";
pub const DEFAULT_PACING_MS: u64 = 50;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub teloxide_token: String,
    pub database_url: String,
    pub log_level: Level,
    pub port: u16,
    pub webhook_url: Option<Url>,
    pub broadcast_schedule: Schedule,
    pub broadcast_offset: FixedOffset,
    pub broadcast_pacing: Duration,
    pub quote_api_url: String,
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let teloxide_token = required("TELOXIDE_TOKEN")?;
        let database_url = required("DATABASE_URL")?;
        let log_level = parse_or(&lookup, "LOG_LEVEL", Level::INFO)?;

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let pacing_ms = parse_or(&lookup, "BROADCAST_PACING_MS", DEFAULT_PACING_MS)?;

        let webhook_url = lookup("WEBHOOK_URL")
            .map(|raw| raw.parse::<Url>().map_err(|e| invalid("WEBHOOK_URL", e)))
            .transpose()?;

        let cron = lookup("BROADCAST_CRON").unwrap_or_else(|| DEFAULT_BROADCAST_CRON.into());
        let broadcast_schedule =
            Schedule::from_str(&cron).map_err(|e| invalid("BROADCAST_CRON", e))?;

        let offset =
            lookup("BROADCAST_UTC_OFFSET").unwrap_or_else(|| DEFAULT_BROADCAST_UTC_OFFSET.into());
        let broadcast_offset = offset
            .parse::<FixedOffset>()
            .map_err(|e| invalid("BROADCAST_UTC_OFFSET", e))?;

        let quote_api_url = lookup("QUOTE_API_URL").unwrap_or_else(|| DEFAULT_QUOTE_API_URL.into());

        Ok(Self {
            teloxide_token,
            database_url,
            log_level,
            port,
            webhook_url,
            broadcast_schedule,
            broadcast_offset,
            broadcast_pacing: Duration::from_millis(pacing_ms),
            quote_api_url,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| invalid(key, e)),
        None => Ok(default),
    }
}

fn invalid(key: &'static str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: err.to_string(),
    }
}
