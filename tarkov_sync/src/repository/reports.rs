//! Key and loot reports submitted by users

use super::item_prices::mode_value;
use super::{
    Condition, ReadOnlyRepository, Record, Repository, RepositoryResult, SequencedRecord,
    SequencedWriteRepository, WriteRepository,
};
use crate::database::{timestamp_column, timestamp_value, Database, DbResult, KEY_REPORT_ID_SEQ};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use tarkov_common::GameMode;

/// A key used once, by one account, in one game mode
#[derive(Debug, Clone, PartialEq)]
pub struct KeyReport {
    pub id: i64,
    /// Account id owned by the security layer
    pub reported_by: i64,
    /// `item_id` of the reported key
    pub key_id: i64,
    pub game_mode: GameMode,
    pub reported_at: DateTime<Utc>,
}

impl Default for KeyReport {
    fn default() -> Self {
        Self {
            id: 0,
            reported_by: 0,
            key_id: 0,
            game_mode: GameMode::Pvp,
            reported_at: DateTime::<Utc>::default(),
        }
    }
}

impl Record for KeyReport {
    const TABLE: &'static str = "key_reports";
    const COLUMNS: &'static [&'static str] =
        &["id", "reported_by", "key_id", "game_mode", "reported_at"];
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        let mode: String = row.get(3)?;
        let game_mode = mode.parse::<GameMode>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
        })?;
        Ok(Self {
            id: row.get(0)?,
            reported_by: row.get(1)?,
            key_id: row.get(2)?,
            game_mode,
            reported_at: timestamp_column(row, 4)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Integer(self.reported_by),
            Value::Integer(self.key_id),
            mode_value(self.game_mode),
            timestamp_value(&self.reported_at),
        ]
    }
}

impl SequencedRecord for KeyReport {
    const SEQUENCE: &'static str = KEY_REPORT_ID_SEQ;
    const ID_COLUMN: &'static str = "id";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// One looted item line of a key report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LootReport {
    pub key_report_id: i64,
    pub item_id: i64,
    pub count: i64,
}

impl Record for LootReport {
    const TABLE: &'static str = "loot_reports";
    const COLUMNS: &'static [&'static str] = &["key_report_id", "item_id", "count"];
    const PRIMARY_KEY: &'static [&'static str] = &["key_report_id", "item_id"];

    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        Ok(Self {
            key_report_id: row.get(0)?,
            item_id: row.get(1)?,
            count: row.get(2)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.key_report_id),
            Value::Integer(self.item_id),
            Value::Integer(self.count),
        ]
    }
}

#[derive(Clone)]
pub struct KeyReportRepository {
    db: Database,
}

impl KeyReportRepository {
    pub const KEY_ID: &'static str = "key_id";

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn find_by_key(&self, key_id: i64) -> RepositoryResult<Vec<KeyReport>> {
        self.read(&[Condition::eq(Self::KEY_ID, key_id)])
    }
}

impl Repository for KeyReportRepository {
    type Record = KeyReport;

    fn database(&self) -> &Database {
        &self.db
    }
}

impl ReadOnlyRepository for KeyReportRepository {}
impl WriteRepository for KeyReportRepository {}
impl SequencedWriteRepository for KeyReportRepository {}

#[derive(Clone)]
pub struct LootReportRepository {
    db: Database,
}

impl LootReportRepository {
    pub const KEY_REPORT_ID: &'static str = "key_report_id";

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn find_by_report(&self, key_report_id: i64) -> RepositoryResult<Vec<LootReport>> {
        self.read(&[Condition::eq(Self::KEY_REPORT_ID, key_report_id)])
    }
}

impl Repository for LootReportRepository {
    type Record = LootReport;

    fn database(&self) -> &Database {
        &self.db
    }
}

impl ReadOnlyRepository for LootReportRepository {}
impl WriteRepository for LootReportRepository {}
