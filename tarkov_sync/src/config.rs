//! Command-line and environment configuration

use crate::market::{Backoff, MarketSettings, DEFAULT_GRAPHQL_URL, DEFAULT_MARKET_URL};
use crate::valuation::ValuationPolicy;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound of the retry backoff
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Tarkov market sync - collects item, key and flea price data into SQLite
#[derive(Parser, Debug, Clone)]
#[command(name = "tarkov_sync")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Path to the SQLite database file
    #[arg(short, long, env = "TARKOV_SYNC_DATABASE", default_value_os_t = default_db_path())]
    pub database: PathBuf,

    /// tarkov-market API key
    #[arg(long, env = "TARKOV_MARKET_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the tarkov-market REST API
    #[arg(long, env = "TARKOV_MARKET_URL", default_value = DEFAULT_MARKET_URL)]
    pub market_url: String,

    /// tarkov.dev query endpoint
    #[arg(long, env = "TARKOV_GRAPHQL_URL", default_value = DEFAULT_GRAPHQL_URL)]
    pub graphql_url: String,

    /// Minutes between two sync cycles
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_minutes: u64,

    /// Minutes to wait before the first sync cycle
    #[arg(long, default_value_t = 10)]
    pub initial_delay_minutes: u64,

    /// Retries of a failed tarkov.dev query (attempts = retries + 1)
    #[arg(long, default_value_t = 5)]
    pub query_retries: u32,

    /// Delay before the first query retry, doubled on every further retry
    #[arg(long, default_value_t = 500)]
    pub retry_backoff_ms: u64,

    /// Timeout of a single HTTP request in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// How items tradeable on the flea market are valued
    #[arg(long, value_enum, default_value_t = ValuationPolicy::FleaOnly)]
    pub valuation_policy: ValuationPolicy,

    /// Run one sync cycle immediately and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,
}

/// Returns the default database path: ~/.local/share/tarkov_sync/tarkov.db
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tarkov_sync")
        .join("tarkov.db")
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_minutes * 60)
    }

    pub fn market_settings(&self) -> MarketSettings {
        MarketSettings {
            market_url: self.market_url.clone(),
            graphql_url: self.graphql_url.clone(),
            api_key: self.api_key.clone(),
            retries: self.query_retries,
            backoff: Backoff::new(Duration::from_millis(self.retry_backoff_ms), MAX_BACKOFF),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config = Config::try_parse_from(["tarkov_sync", "--api-key", "secret"]).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.interval(), Duration::from_secs(600));
        assert_eq!(config.initial_delay(), Duration::from_secs(600));
        assert_eq!(config.query_retries, 5);
        assert_eq!(config.valuation_policy, ValuationPolicy::FleaOnly);
        assert!(!config.once);
        assert!(config.database.ends_with("tarkov_sync/tarkov.db"));
    }

    #[test]
    fn market_settings_follow_flags() {
        let config = Config::try_parse_from([
            "tarkov_sync",
            "--api-key",
            "secret",
            "--market-url",
            "http://localhost:8080",
            "--query-retries",
            "2",
            "--retry-backoff-ms",
            "100",
            "--request-timeout-secs",
            "5",
            "--valuation-policy",
            "best-of-flea-and-trader",
        ])
        .unwrap();

        let settings = config.market_settings();
        assert_eq!(settings.market_url, "http://localhost:8080");
        assert_eq!(settings.graphql_url, DEFAULT_GRAPHQL_URL);
        assert_eq!(settings.retries, 2);
        assert_eq!(settings.backoff.base, Duration::from_millis(100));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(config.valuation_policy, ValuationPolicy::BestOfFleaAndTrader);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result =
            Config::try_parse_from(["tarkov_sync", "--api-key", "k", "--interval-minutes", "0"]);
        assert!(result.is_err());
    }
}
