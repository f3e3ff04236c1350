//! Items, keyed by their external `tarkov_id`

use super::{
    Condition, ReadOnlyRepository, Record, Repository, RepositoryResult, SequencedRecord,
    SequencedWriteRepository, WriteRepository,
};
use crate::database::{timestamp_column, timestamp_value, Database, DbResult, ITEM_ID_SEQ};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use tarkov_common::{Currency, GameMode};

/// One row per distinct external item
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub tarkov_id: String,
    pub market_id: Option<String>,
    pub name: String,
    pub short_name: Option<String>,
    pub icon_link: Option<String>,
    pub wiki_link: Option<String>,
    pub market_link: Option<String>,
    pub horizontal_slots: i64,
    pub vertical_slots: i64,
    pub slots: Option<i64>,
    pub tags: Vec<String>,
    pub trader_name: Option<String>,
    pub trader_price: i64,
    pub trader_currency: Currency,
    pub pvp_flea_price: Option<i64>,
    pub pvp_banned_on_flea: bool,
    pub pve_flea_price: Option<i64>,
    pub pve_banned_on_flea: bool,
    /// Source-reported recency of the base fields
    pub last_update: DateTime<Utc>,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            id: 0,
            tarkov_id: String::new(),
            market_id: None,
            name: String::new(),
            short_name: None,
            icon_link: None,
            wiki_link: None,
            market_link: None,
            horizontal_slots: 1,
            vertical_slots: 1,
            slots: None,
            tags: Vec::new(),
            trader_name: None,
            trader_price: 0,
            trader_currency: Currency::Rouble,
            pvp_flea_price: None,
            pvp_banned_on_flea: false,
            pve_flea_price: None,
            pve_banned_on_flea: false,
            last_update: DateTime::<Utc>::default(),
        }
    }
}

impl Item {
    pub fn flea_price(&self, mode: GameMode) -> Option<i64> {
        match mode {
            GameMode::Pvp => self.pvp_flea_price,
            GameMode::Pve => self.pve_flea_price,
        }
    }

    pub fn banned_on_flea(&self, mode: GameMode) -> bool {
        match mode {
            GameMode::Pvp => self.pvp_banned_on_flea,
            GameMode::Pve => self.pve_banned_on_flea,
        }
    }

    /// Set the flea state of one game mode; a banned item has no flea price
    pub fn with_flea_state(mut self, mode: GameMode, flea_price: Option<i64>, banned: bool) -> Self {
        let flea_price = if banned { None } else { flea_price };
        match mode {
            GameMode::Pvp => {
                self.pvp_flea_price = flea_price;
                self.pvp_banned_on_flea = banned;
            }
            GameMode::Pve => {
                self.pve_flea_price = flea_price;
                self.pve_banned_on_flea = banned;
            }
        }
        self
    }
}

impl Record for Item {
    const TABLE: &'static str = "items";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tarkov_id",
        "market_id",
        "name",
        "short_name",
        "icon_link",
        "wiki_link",
        "market_link",
        "horizontal_slots",
        "vertical_slots",
        "slots",
        "tags",
        "trader_name",
        "trader_price",
        "trader_currency",
        "pvp_flea_price",
        "pvp_banned_on_flea",
        "pve_flea_price",
        "pve_banned_on_flea",
        "last_update",
    ];
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        let tags_json: String = row.get(11)?;
        let tags: Vec<String> = serde_json::from_str(&tags_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e)))?;
        let currency: String = row.get(14)?;

        Ok(Self {
            id: row.get(0)?,
            tarkov_id: row.get(1)?,
            market_id: row.get(2)?,
            name: row.get(3)?,
            short_name: row.get(4)?,
            icon_link: row.get(5)?,
            wiki_link: row.get(6)?,
            market_link: row.get(7)?,
            horizontal_slots: row.get(8)?,
            vertical_slots: row.get(9)?,
            slots: row.get(10)?,
            tags,
            trader_name: row.get(12)?,
            trader_price: row.get(13)?,
            trader_currency: Currency::from_symbol(Some(&currency)),
            pvp_flea_price: row.get(15)?,
            pvp_banned_on_flea: row.get(16)?,
            pve_flea_price: row.get(17)?,
            pve_banned_on_flea: row.get(18)?,
            last_update: timestamp_column(row, 19)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        // Serializing a list of strings cannot fail
        let tags = serde_json::to_string(&self.tags).unwrap_or_else(|_| "[]".to_string());
        vec![
            Value::Integer(self.id),
            Value::Text(self.tarkov_id.clone()),
            self.market_id.clone().into(),
            Value::Text(self.name.clone()),
            self.short_name.clone().into(),
            self.icon_link.clone().into(),
            self.wiki_link.clone().into(),
            self.market_link.clone().into(),
            Value::Integer(self.horizontal_slots),
            Value::Integer(self.vertical_slots),
            self.slots.into(),
            Value::Text(tags),
            self.trader_name.clone().into(),
            Value::Integer(self.trader_price),
            Value::Text(self.trader_currency.symbol().to_string()),
            self.pvp_flea_price.into(),
            self.pvp_banned_on_flea.into(),
            self.pve_flea_price.into(),
            self.pve_banned_on_flea.into(),
            timestamp_value(&self.last_update),
        ]
    }
}

impl SequencedRecord for Item {
    const SEQUENCE: &'static str = ITEM_ID_SEQ;
    const ID_COLUMN: &'static str = "id";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// Store for [`Item`]: read, write and sequenced insert
#[derive(Clone)]
pub struct ItemRepository {
    db: Database,
}

impl ItemRepository {
    pub const TARKOV_ID: &'static str = "tarkov_id";

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn exists_by_tarkov_id(&self, tarkov_id: &str) -> RepositoryResult<bool> {
        self.exists(&[Condition::eq_text(Self::TARKOV_ID, tarkov_id)])
    }

    pub fn find_by_tarkov_id(&self, tarkov_id: &str) -> RepositoryResult<Item> {
        self.find(&[Condition::eq_text(Self::TARKOV_ID, tarkov_id)])
    }

    pub fn find_optional_by_tarkov_id(&self, tarkov_id: &str) -> RepositoryResult<Option<Item>> {
        self.find_optional(&[Condition::eq_text(Self::TARKOV_ID, tarkov_id)])
    }
}

impl Repository for ItemRepository {
    type Record = Item;

    fn database(&self) -> &Database {
        &self.db
    }
}

impl ReadOnlyRepository for ItemRepository {}
impl WriteRepository for ItemRepository {}
impl SequencedWriteRepository for ItemRepository {}
