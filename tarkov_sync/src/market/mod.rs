//! Clients for the two market data sources
//!
//! - tarkov-market REST: full item lists per game mode, one GET each, no retry
//! - tarkov.dev queries: item dimensions and key uses, through [`QueryExecutor`]

mod query;

pub use query::{Backoff, ItemsData, Query, QueryExecutor, DEFAULT_RETRIES, FETCH_ITEM_SLOTS, FETCH_KEYS};

use crate::error::{Result, SyncError};
use std::time::Duration;
use tarkov_common::{FetchError, GameMode, ItemSlots, KeyUses, MarketItem, QueryError};

pub const DEFAULT_MARKET_URL: &str = "https://api.tarkov-market.app";
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.tarkov.dev/graphql";

const USER_AGENT: &str = "tarkov_sync/1.0";

/// Everything needed to reach both sources
#[derive(Debug, Clone)]
pub struct MarketSettings {
    pub market_url: String,
    pub graphql_url: String,
    pub api_key: String,
    pub retries: u32,
    pub backoff: Backoff,
    pub request_timeout: Duration,
}

impl MarketSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            market_url: DEFAULT_MARKET_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            api_key: api_key.into(),
            retries: DEFAULT_RETRIES,
            backoff: Backoff::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct MarketClient {
    http: reqwest::Client,
    market_url: String,
    api_key: String,
    queries: QueryExecutor,
}

impl MarketClient {
    pub fn new(settings: &MarketSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(SyncError::HttpClient)?;

        let queries = QueryExecutor::new(http.clone(), settings.graphql_url.clone())
            .with_retries(settings.retries)
            .with_backoff(settings.backoff);

        Ok(Self {
            http,
            market_url: settings.market_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            queries,
        })
    }

    fn items_url(&self, mode: GameMode) -> String {
        match mode {
            GameMode::Pvp => format!("{}/api/v1/items/all", self.market_url),
            GameMode::Pve => format!("{}/api/v1/pve/items/all", self.market_url),
        }
    }

    /// Fetch the full tarkov-market item list for one game mode
    pub async fn fetch_items(&self, mode: GameMode) -> std::result::Result<Vec<MarketItem>, FetchError> {
        let url = self.items_url(mode);
        log::info!("Fetching {} items from {}", mode, url);

        let response = self
            .http
            .get(&url)
            .query(&[("x-api-key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        let items: Vec<MarketItem> = serde_json::from_str(&body)?;

        log::info!("Fetched {} {} items", items.len(), mode);
        Ok(items)
    }

    /// Item dimensions from tarkov.dev
    pub async fn fetch_item_slots(&self) -> std::result::Result<Vec<ItemSlots>, QueryError> {
        let data: ItemsData<ItemSlots> = self.queries.execute(&FETCH_ITEM_SLOTS).await?;
        let slots = data.into_items();
        log::info!("Fetched slot information for {} items", slots.len());
        Ok(slots)
    }

    /// Key use counts from tarkov.dev
    pub async fn fetch_key_uses(&self) -> std::result::Result<Vec<KeyUses>, QueryError> {
        let data: ItemsData<KeyUses> = self.queries.execute(&FETCH_KEYS).await?;
        let keys = data.into_items();
        log::info!("Fetched use counts for {} keys", keys.len());
        Ok(keys)
    }
}

#[cfg(test)]
#[path = "market_tests.rs"]
mod tests;
