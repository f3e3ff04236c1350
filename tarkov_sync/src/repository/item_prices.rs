//! Append-only flea price history

use super::{Condition, ReadOnlyRepository, Record, Repository, RepositoryResult, WriteRepository};
use crate::database::{timestamp_column, timestamp_value, Database, DbResult};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use tarkov_common::GameMode;

/// One point of an item's per-mode flea price series
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPrice {
    pub item_id: i64,
    pub mode: GameMode,
    pub timestamp: DateTime<Utc>,
    pub flea_price: Option<i64>,
    pub banned_on_flea: bool,
}

impl Default for ItemPrice {
    fn default() -> Self {
        Self {
            item_id: 0,
            mode: GameMode::Pvp,
            timestamp: DateTime::<Utc>::default(),
            flea_price: None,
            banned_on_flea: false,
        }
    }
}

impl Record for ItemPrice {
    const TABLE: &'static str = "item_prices";
    const COLUMNS: &'static [&'static str] =
        &["item_id", "mode", "timestamp", "flea_price", "banned_on_flea"];
    const PRIMARY_KEY: &'static [&'static str] = &["item_id", "mode", "timestamp"];

    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        let mode: String = row.get(1)?;
        let mode = mode.parse::<GameMode>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into())
        })?;
        Ok(Self {
            item_id: row.get(0)?,
            mode,
            timestamp: timestamp_column(row, 2)?,
            flea_price: row.get(3)?,
            banned_on_flea: row.get(4)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.item_id),
            mode_value(self.mode),
            timestamp_value(&self.timestamp),
            self.flea_price.into(),
            self.banned_on_flea.into(),
        ]
    }
}

pub(crate) fn mode_value(mode: GameMode) -> Value {
    Value::Text(mode.as_str().to_string())
}

/// Store for [`ItemPrice`]: read and write, never updated by the pipeline
#[derive(Clone)]
pub struct ItemPriceRepository {
    db: Database,
}

impl ItemPriceRepository {
    pub const ITEM_ID: &'static str = "item_id";
    pub const MODE: &'static str = "mode";
    pub const TIMESTAMP: &'static str = "timestamp";

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn snapshot_key(item_id: i64, mode: GameMode, timestamp: &DateTime<Utc>) -> [Condition; 3] {
        [
            Condition::eq(Self::ITEM_ID, item_id),
            Condition::Eq(Self::MODE, mode_value(mode)),
            Condition::Eq(Self::TIMESTAMP, timestamp_value(timestamp)),
        ]
    }

    pub fn exists_snapshot(
        &self,
        item_id: i64,
        mode: GameMode,
        timestamp: &DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        self.exists(&Self::snapshot_key(item_id, mode, timestamp))
    }

    /// Price series of one item in one mode, oldest first
    pub fn history(&self, item_id: i64, mode: GameMode) -> RepositoryResult<Vec<ItemPrice>> {
        self.read(&[
            Condition::eq(Self::ITEM_ID, item_id),
            Condition::Eq(Self::MODE, mode_value(mode)),
        ])
    }

    /// Whether a snapshot later than `timestamp` exists for one item in one mode
    pub fn has_newer_snapshot(
        &self,
        item_id: i64,
        mode: GameMode,
        timestamp: &DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        self.exists(&[
            Condition::eq(Self::ITEM_ID, item_id),
            Condition::Eq(Self::MODE, mode_value(mode)),
            Condition::Gt(Self::TIMESTAMP, timestamp_value(timestamp)),
        ])
    }
}

impl Repository for ItemPriceRepository {
    type Record = ItemPrice;

    fn database(&self) -> &Database {
        &self.db
    }
}

impl ReadOnlyRepository for ItemPriceRepository {}
impl WriteRepository for ItemPriceRepository {}
