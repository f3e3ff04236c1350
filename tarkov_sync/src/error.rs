//! Error types for tarkov_sync

use tarkov_common::{FetchError, QueryError};
use thiserror::Error;

/// Failure of a repository operation
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// `find` matched no row
    #[error("No {table} row matches {conditions}")]
    NotFound {
        table: &'static str,
        conditions: String,
    },
    /// `find` matched more than one row
    #[error("Expected exactly one {table} row for {conditions}, found {count}")]
    Ambiguous {
        table: &'static str,
        conditions: String,
        count: usize,
    },
    /// Database operation failed (constraint violation, I/O, ...)
    #[error("Database error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}

/// Unified error type for tarkov_sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// REST fetch against tarkov-market failed
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Query against tarkov.dev exhausted its retries
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// A currency basis item is not in the database yet
    #[error("Currency basis item {tarkov_id} ({currency}) is missing, run a sync first")]
    MissingCurrencyBasis {
        currency: &'static str,
        tarkov_id: &'static str,
    },
    /// Report rejected before anything was written
    #[error("Invalid report: {0}")]
    InvalidReport(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::Repository(RepositoryError::Persistence(err))
    }
}

/// Result alias for tarkov_sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
