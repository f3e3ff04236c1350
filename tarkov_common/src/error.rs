//! Errors raised while talking to the market data sources

use thiserror::Error;

/// Failure of a single REST fetch (no retry at this layer)
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP error status code
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Failed to parse JSON response
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why a single query attempt failed
#[derive(Debug, Error)]
pub enum QueryFailure {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// The response decoded but carried no data
    #[error("empty payload{}", format_errors(.errors))]
    EmptyPayload { errors: Vec<String> },
}

fn format_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(": {}", errors.join("; "))
    }
}

/// A query that kept failing until its retry budget ran out
#[derive(Debug, Error)]
#[error("query {operation} failed after {attempts} attempt(s): {cause}")]
pub struct QueryError {
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub cause: QueryFailure,
}
