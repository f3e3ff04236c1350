//! Reconciliation of market data into the local store
//!
//! One cycle runs four phases strictly in order: items (PVP), items (PVE),
//! slots, keys. Every phase is fetched, then applied through the
//! repositories; the first error aborts the rest of the cycle.
//!
//! Item base fields are guarded by the source-reported update time: they are
//! only overwritten by a strictly newer observation. Price snapshots are
//! captured independently of that guard and deduplicated on
//! `(item, mode, timestamp)`, so repeated or overlapping cycles are safe.

use crate::database::Database;
use crate::error::Result;
use crate::market::MarketClient;
use crate::progress::{track_progress, LogProgress, ProgressObserver};
use crate::repository::{
    Condition, Item, ItemPrice, ItemPriceRepository, ItemRepository, Key, KeyRepository,
    ReadOnlyRepository, SequencedWriteRepository, WriteRepository,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tarkov_common::{Currency, GameMode, ItemSlots, KeyUses, MarketItem};

/// Result of applying one item list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemSyncStats {
    pub inserted: usize,
    /// Base fields overwritten by a newer observation
    pub updated: usize,
    /// Present and not newer than what is stored
    pub unchanged: usize,
    /// No usable update time: nothing applied, or only the new row without
    /// a price snapshot
    pub skipped: usize,
    pub prices_inserted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotSyncStats {
    pub updated: usize,
    pub unchanged: usize,
    /// Unknown `tarkov_id`
    pub skipped: usize,
    /// 1x1 entries carrying no size information
    pub filtered: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeySyncStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Unknown item or no `uses` property
    pub skipped: usize,
}

/// Statistics of one full cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub pvp: ItemSyncStats,
    pub pve: ItemSyncStats,
    pub slots: SlotSyncStats,
    pub keys: KeySyncStats,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn items(&self, mode: GameMode) -> &ItemSyncStats {
        match mode {
            GameMode::Pvp => &self.pvp,
            GameMode::Pve => &self.pve,
        }
    }
}

/// Applies market data to the item, price and key stores
#[derive(Clone)]
pub struct Reconciler {
    items: ItemRepository,
    prices: ItemPriceRepository,
    keys: KeyRepository,
    observer: Arc<dyn ProgressObserver>,
}

impl Reconciler {
    pub fn new(db: &Database) -> Self {
        Self {
            items: ItemRepository::new(db.clone()),
            prices: ItemPriceRepository::new(db.clone()),
            keys: KeyRepository::new(db.clone()),
            observer: Arc::new(LogProgress),
        }
    }

    /// Replace the default logging progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn items(&self) -> &ItemRepository {
        &self.items
    }

    pub fn prices(&self) -> &ItemPriceRepository {
        &self.prices
    }

    pub fn keys(&self) -> &KeyRepository {
        &self.keys
    }

    /// Run one full cycle: items (PVP) → items (PVE) → slots → keys
    pub async fn run_cycle(&self, client: &MarketClient) -> Result<CycleReport> {
        let started = Instant::now();
        log::info!("Starting sync cycle");

        let mut report = CycleReport::default();

        for mode in GameMode::ALL {
            let items = client.fetch_items(mode).await?;
            let stats = self.sync_items(&items, mode)?;
            match mode {
                GameMode::Pvp => report.pvp = stats,
                GameMode::Pve => report.pve = stats,
            }
        }

        let slots = client.fetch_item_slots().await?;
        report.slots = self.sync_slots(&slots)?;

        let keys = client.fetch_key_uses().await?;
        report.keys = self.sync_keys(&keys)?;

        report.elapsed = started.elapsed();
        log::info!("Sync cycle finished in {:.1}s", report.elapsed.as_secs_f64());
        Ok(report)
    }

    /// Upsert every source item of one game mode and capture its price
    pub fn sync_items(&self, source: &[MarketItem], mode: GameMode) -> Result<ItemSyncStats> {
        log::info!("Starting to update {} {} items", source.len(), mode);
        let mut stats = ItemSyncStats::default();

        track_progress(
            &format!("Update {} items", mode),
            source,
            self.observer.as_ref(),
            |item| self.sync_item(item, mode, &mut stats),
        )?;

        log::info!(
            "{} items: {} inserted, {} updated, {} unchanged, {} skipped, {} new prices",
            mode,
            stats.inserted,
            stats.updated,
            stats.unchanged,
            stats.skipped,
            stats.prices_inserted
        );
        Ok(stats)
    }

    fn sync_item(&self, source: &MarketItem, mode: GameMode, stats: &mut ItemSyncStats) -> Result<()> {
        let banned = source.is_banned_on_flea();
        let flea_price = if banned { None } else { source.avg24h_price };
        let updated = source.updated_at();

        let Some(existing) = self.items.find_optional_by_tarkov_id(&source.bsg_id)? else {
            // Undated items start at the epoch so any dated observation wins
            let last_update = updated.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            let id = self.items.insert_with_id(|item| {
                apply_base_fields(item, source, last_update).with_flea_state(mode, flea_price, banned)
            })?;
            log::debug!("Inserted item {} as {}", source.bsg_id, id);
            stats.inserted += 1;
            match updated {
                Some(updated) => {
                    if self.insert_price_snapshot(id, mode, updated, flea_price, banned)? {
                        stats.prices_inserted += 1;
                    }
                }
                None => {
                    log::warn!(
                        "Item {} ({}) has no usable update time, price not recorded",
                        source.bsg_id,
                        source.name.as_deref().unwrap_or("unnamed")
                    );
                    stats.skipped += 1;
                }
            }
            return Ok(());
        };

        let Some(updated) = updated else {
            log::warn!(
                "Skipping {} ({}): no usable update time",
                source.bsg_id,
                source.name.as_deref().unwrap_or("unnamed")
            );
            stats.skipped += 1;
            return Ok(());
        };

        if updated > existing.last_update {
            self.items
                .update_by_id(|item| apply_base_fields(item, source, updated), existing.id)?;
            stats.updated += 1;
        } else {
            stats.unchanged += 1;
        }

        if self.insert_price_snapshot(existing.id, mode, updated, flea_price, banned)? {
            stats.prices_inserted += 1;
            // Only the newest snapshot drives the item's current flea state
            if !self.prices.has_newer_snapshot(existing.id, mode, &updated)? {
                self.items.update_by_id(
                    |item| item.with_flea_state(mode, flea_price, banned),
                    existing.id,
                )?;
            }
        }

        Ok(())
    }

    /// Insert a price snapshot unless one exists for the same key.
    /// Returns whether a row was written.
    pub fn insert_price_snapshot(
        &self,
        item_id: i64,
        mode: GameMode,
        timestamp: DateTime<Utc>,
        flea_price: Option<i64>,
        banned: bool,
    ) -> Result<bool> {
        if self.prices.exists_snapshot(item_id, mode, &timestamp)? {
            log::trace!("Price of item {} ({}) at {} already recorded", item_id, mode, timestamp);
            return Ok(false);
        }

        self.prices.insert(|_| ItemPrice {
            item_id,
            mode,
            timestamp,
            flea_price: if banned { None } else { flea_price },
            banned_on_flea: banned,
        })?;
        Ok(true)
    }

    /// Apply item dimensions, ignoring 1x1 entries
    pub fn sync_slots(&self, source: &[ItemSlots]) -> Result<SlotSyncStats> {
        let mut stats = SlotSyncStats::default();
        let sized: Vec<&ItemSlots> = source
            .iter()
            .filter(|slots| slots.has_size_information())
            .collect();
        stats.filtered = source.len() - sized.len();

        track_progress("Update item slots", &sized, self.observer.as_ref(), |slots| -> Result<()> {
            let Some(stored) = self.items.find_optional_by_tarkov_id(&slots.id)? else {
                log::warn!("Skipping slots of unknown item {}", slots.id);
                stats.skipped += 1;
                return Ok(());
            };

            if stored.horizontal_slots == slots.width && stored.vertical_slots == slots.height {
                stats.unchanged += 1;
                return Ok(());
            }

            let (width, height) = (slots.width, slots.height);
            self.items.update_by_id(
                |item| Item {
                    horizontal_slots: width,
                    vertical_slots: height,
                    ..item
                },
                stored.id,
            )?;
            stats.updated += 1;
            Ok(())
        })?;

        log::info!(
            "Item slots: {} updated, {} unchanged, {} skipped, {} without size information",
            stats.updated,
            stats.unchanged,
            stats.skipped,
            stats.filtered
        );
        Ok(stats)
    }

    /// Create or refresh the use count of every known key
    pub fn sync_keys(&self, source: &[KeyUses]) -> Result<KeySyncStats> {
        let mut stats = KeySyncStats::default();

        track_progress("Update keys", source, self.observer.as_ref(), |entry| -> Result<()> {
            let Some(uses) = entry.uses() else {
                log::warn!("Skipping key {}: no uses property", entry.id);
                stats.skipped += 1;
                return Ok(());
            };

            let Some(item) = self.items.find_optional_by_tarkov_id(&entry.id)? else {
                log::warn!(
                    "Skipping key {} ({}): item not synced yet",
                    entry.id,
                    entry.name.as_deref().unwrap_or("unnamed")
                );
                stats.skipped += 1;
                return Ok(());
            };

            match self.keys.find_by_item_id(item.id)? {
                Some(key) if key.uses == uses => stats.unchanged += 1,
                Some(_) => {
                    self.keys.update(
                        |key| Key { uses, ..key },
                        &[Condition::eq(KeyRepository::ITEM_ID, item.id)],
                    )?;
                    stats.updated += 1;
                }
                None => {
                    self.keys.insert(|_| Key {
                        item_id: item.id,
                        uses,
                    })?;
                    stats.inserted += 1;
                }
            }
            Ok(())
        })?;

        log::info!(
            "Keys: {} inserted, {} updated, {} unchanged, {} skipped",
            stats.inserted,
            stats.updated,
            stats.unchanged,
            stats.skipped
        );
        Ok(stats)
    }

    /// Number of stored items, for startup logging
    pub fn item_count(&self) -> Result<usize> {
        Ok(self.items.count(&[])?)
    }
}

/// Copy the mode-independent fields of `source` onto `item`
fn apply_base_fields(item: Item, source: &MarketItem, updated: DateTime<Utc>) -> Item {
    Item {
        tarkov_id: source.bsg_id.clone(),
        market_id: Some(source.uid.clone()),
        name: source.name.clone().unwrap_or(item.name),
        short_name: source.short_name.clone().or(item.short_name),
        icon_link: source.icon_link().map(str::to_string).or(item.icon_link),
        wiki_link: source.wiki_link.clone().or(item.wiki_link),
        market_link: source.link.clone().or(item.market_link),
        slots: source.slots.or(item.slots),
        tags: source.tags.clone().unwrap_or_default(),
        trader_name: source.trader_name.clone().or(item.trader_name),
        trader_price: source.trader_price.unwrap_or(0),
        trader_currency: Currency::from_symbol(source.trader_price_cur.as_deref()),
        last_update: updated,
        ..item
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
