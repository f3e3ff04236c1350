//! Tarkov Sync - market data, flea price history and loot reports
//!
//! Periodically pulls item, price, slot and key data from tarkov-market and
//! tarkov.dev, reconciles it into SQLite and values items and key reports in
//! roubles.

pub mod config;
pub mod database;
pub mod error;
pub mod market;
pub mod progress;
pub mod reconcile;
pub mod reports;
pub mod repository;
pub mod scheduler;
pub mod valuation;

pub use config::Config;
pub use database::Database;
pub use error::{RepositoryError, Result, SyncError};
pub use market::{MarketClient, MarketSettings};
pub use reconcile::{CycleReport, Reconciler};
pub use reports::{LootLine, ReportService, ReportValuation};
pub use scheduler::{Scheduler, SingleFlight};
pub use valuation::{CurrencyRates, ItemValuer, ValuationPolicy};
