use std::{future::Future, time::Duration};

use serde::Deserialize;

use crate::messages::FALLBACK_QUOTE;

/// Something that hands out a displayable quote. Never fails: implementations
/// substitute [`FALLBACK_QUOTE`] on their own.
pub trait QuoteSource {
    fn fetch_quote(&self) -> impl Future<Output = String> + Send;
}

#[derive(Debug, Deserialize)]
struct ZenQuote {
    #[serde(rename = "q")]
    text: String,
    #[serde(rename = "a")]
    author: String,
}

impl ZenQuote {
    fn render(&self) -> String {
        format!("\"{}\"\n\n- {}", self.text, self.author)
    }
}

#[derive(Debug, Clone)]
pub struct ZenQuotes {
    client: reqwest::Client,
    url: String,
}

impl ZenQuotes {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn try_fetch(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let quotes: Vec<ZenQuote> = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        quotes
            .first()
            .map(ZenQuote::render)
            .ok_or_else(|| "quote API returned an empty list".into())
    }
}

impl QuoteSource for ZenQuotes {
    async fn fetch_quote(&self) -> String {
        tracing::debug!("Fetching quote from {}", self.url);
        match self.try_fetch().await {
            Ok(quote) => quote,
            Err(e) => {
                tracing::error!("Quote API error: {e}");
                FALLBACK_QUOTE.to_string()
            }
        }
    }
}
