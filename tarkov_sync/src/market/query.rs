//! tarkov.dev query execution with bounded retries
//!
//! A query is POSTed as `{"query": "..."}` and answered with
//! `{"data": ..., "errors": [...]}`. An attempt counts as failed when the
//! transport fails, the status is not 2xx, the body does not decode, or
//! `data` is missing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tarkov_common::{QueryError, QueryFailure};

/// Retries after the first attempt, so `n + 1` attempts in total
pub const DEFAULT_RETRIES: u32 = 5;

/// Exponential delay between attempts, capped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// No waiting at all, for tests
    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}

/// A named query document
#[derive(Debug, Clone, Copy)]
pub struct Query {
    pub operation: &'static str,
    pub document: &'static str,
}

pub const FETCH_ITEM_SLOTS: Query = Query {
    operation: "FetchItemSlots",
    document: "query FetchItemSlots { items { id width height } }",
};

pub const FETCH_KEYS: Query = Query {
    operation: "FetchKeys",
    document: "query FetchKeys { items(type: keys) { id name properties { ... on ItemPropertiesKey { uses } } } }",
};

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Option<Vec<QueryMessage>>,
}

#[derive(Deserialize)]
struct QueryMessage {
    message: String,
}

/// `{"items": [...]}`, the shape of both queries; entries may be null
#[derive(Debug, Deserialize)]
pub struct ItemsData<T> {
    pub items: Option<Vec<Option<T>>>,
}

impl<T> ItemsData<T> {
    pub fn into_items(self) -> Vec<T> {
        self.items.unwrap_or_default().into_iter().flatten().collect()
    }
}

/// Runs queries against one endpoint with a fixed retry budget
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    client: reqwest::Client,
    endpoint: String,
    retries: u32,
    backoff: Backoff,
}

impl QueryExecutor {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            retries: DEFAULT_RETRIES,
            backoff: Backoff::default(),
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute `query`, retrying until it yields data or the budget is spent
    pub async fn execute<D: DeserializeOwned>(&self, query: &Query) -> Result<D, QueryError> {
        let attempts = self.retries + 1;
        let mut attempt = 1;

        loop {
            log::debug!("Executing query {} (attempt {}/{})", query.operation, attempt, attempts);

            let failure = match self.attempt::<D>(query.document).await {
                Ok(data) => {
                    log::debug!("Query {} executed successfully", query.operation);
                    return Ok(data);
                }
                Err(failure) => failure,
            };

            if attempt >= attempts {
                log::error!(
                    "Query {} failed after {} attempt(s): {}",
                    query.operation,
                    attempts,
                    failure
                );
                return Err(QueryError {
                    operation: query.operation.to_string(),
                    attempts,
                    cause: failure,
                });
            }

            let delay = self.backoff.delay(attempt);
            log::warn!(
                "Query {} failed ({}), retrying in {:?}, {} retries left",
                query.operation,
                failure,
                delay,
                attempts - attempt
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt<D: DeserializeOwned>(&self, document: &str) -> Result<D, QueryFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&QueryBody { query: document })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueryFailure::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        let decoded: QueryResponse<D> = serde_json::from_str(&body)?;

        match decoded.data {
            Some(data) => Ok(data),
            None => Err(QueryFailure::EmptyPayload {
                errors: decoded
                    .errors
                    .unwrap_or_default()
                    .into_iter()
                    .map(|e| e.message)
                    .collect(),
            }),
        }
    }
}
