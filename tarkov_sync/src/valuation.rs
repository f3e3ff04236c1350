//! In-game rouble value of items
//!
//! Trader prices in dollars or euros are converted through two basis items
//! whose own trader price is the current rouble exchange rate.

use crate::error::{Result, SyncError};
use crate::repository::{Item, ItemRepository};
use tarkov_common::{Currency, GameMode};

/// `tarkov_id` of the dollar basis item
pub const USD_BASIS_ID: &str = "5696686a4bdc2da3298b456a";
/// `tarkov_id` of the euro basis item
pub const EUR_BASIS_ID: &str = "569668774bdc2da2298b4568";

/// How an item that is tradeable on the flea market is valued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ValuationPolicy {
    /// The flea price, zero when unknown
    #[default]
    FleaOnly,
    /// The higher of the flea price and the converted trader price
    BestOfFleaAndTrader,
}

/// Rouble exchange rates read from the basis items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyRates {
    pub usd: i64,
    pub eur: i64,
}

impl CurrencyRates {
    /// Read both basis items; fails if either is not synced yet
    pub fn load(items: &ItemRepository) -> Result<Self> {
        let usd = basis_rate(items, "USD", USD_BASIS_ID)?;
        let eur = basis_rate(items, "EUR", EUR_BASIS_ID)?;
        log::debug!("Currency rates: 1$ = {}₽, 1€ = {}₽", usd, eur);
        Ok(Self { usd, eur })
    }

    /// Roubles per unit of `currency`
    pub fn rate(&self, currency: Currency) -> i64 {
        match currency {
            Currency::Rouble => 1,
            Currency::Dollar => self.usd,
            Currency::Euro => self.eur,
        }
    }
}

fn basis_rate(items: &ItemRepository, currency: &'static str, tarkov_id: &'static str) -> Result<i64> {
    match items.find_optional_by_tarkov_id(tarkov_id)? {
        Some(item) => Ok(item.trader_price),
        None => Err(SyncError::MissingCurrencyBasis {
            currency,
            tarkov_id,
        }),
    }
}

/// Values items in roubles for one set of rates and a policy
#[derive(Debug, Clone, Copy)]
pub struct ItemValuer {
    rates: CurrencyRates,
    policy: ValuationPolicy,
}

impl ItemValuer {
    pub fn new(rates: CurrencyRates, policy: ValuationPolicy) -> Self {
        Self { rates, policy }
    }

    /// Load current rates from the store
    pub fn load(items: &ItemRepository, policy: ValuationPolicy) -> Result<Self> {
        Ok(Self::new(CurrencyRates::load(items)?, policy))
    }

    pub fn policy(&self) -> ValuationPolicy {
        self.policy
    }

    /// Trader price converted to roubles
    pub fn trader_value(&self, item: &Item) -> i64 {
        item.trader_price * self.rates.rate(item.trader_currency)
    }

    /// Value of `item` in `mode`, in roubles
    pub fn item_value(&self, item: &Item, mode: GameMode) -> i64 {
        if item.banned_on_flea(mode) {
            return self.trader_value(item);
        }

        let flea = item.flea_price(mode).unwrap_or(0);
        match self.policy {
            ValuationPolicy::FleaOnly => flea,
            ValuationPolicy::BestOfFleaAndTrader => flea.max(self.trader_value(item)),
        }
    }
}
