//! DTOs returned by the market data sources

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One entry of the tarkov-market `items/all` array
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MarketItem {
    pub uid: String,
    pub name: Option<String>,
    pub banned_on_flea: Option<bool>,
    pub have_market_data: Option<bool>,
    pub short_name: Option<String>,
    pub price: Option<i64>,
    pub base_price: Option<i64>,
    pub avg24h_price: Option<i64>,
    pub avg7days_price: Option<i64>,
    pub trader_name: Option<String>,
    pub trader_price: Option<i64>,
    pub trader_price_cur: Option<String>,
    pub trader_price_rub: Option<i64>,
    /// ISO-8601 timestamp of the last market update
    pub updated: Option<String>,
    pub slots: Option<i64>,
    pub icon: Option<String>,
    pub link: Option<String>,
    pub wiki_link: Option<String>,
    pub img: Option<String>,
    pub img_big: Option<String>,
    pub bsg_id: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub diff24h: Option<f64>,
    pub diff7days: Option<f64>,
    pub is_functional: Option<bool>,
    pub reference: Option<String>,
}

impl MarketItem {
    /// Parse the source-reported update time, if present and well-formed
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.updated.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                log::debug!("Unparseable update time '{}' for {}: {}", raw, self.bsg_id, e);
                None
            }
        }
    }

    /// Icon link, falling back to the big image when the icon is blank
    pub fn icon_link(&self) -> Option<&str> {
        match self.icon.as_deref() {
            Some(icon) if !icon.trim().is_empty() => Some(icon),
            _ => self.img_big.as_deref(),
        }
    }

    pub fn is_banned_on_flea(&self) -> bool {
        self.banned_on_flea.unwrap_or(false)
    }
}

/// Physical dimensions of an item, from tarkov.dev
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ItemSlots {
    pub id: String,
    pub width: i64,
    pub height: i64,
}

impl ItemSlots {
    /// A 1x1 answer means "no size information", not a real 1x1 item
    pub fn has_size_information(&self) -> bool {
        self.width * self.height != 1
    }
}

/// Key use-count entry, from tarkov.dev
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct KeyUses {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Option<KeyProperties>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct KeyProperties {
    #[serde(default)]
    pub uses: Option<i64>,
}

impl KeyUses {
    pub fn uses(&self) -> Option<i64> {
        self.properties.as_ref().and_then(|p| p.uses)
    }
}
