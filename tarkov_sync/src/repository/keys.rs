//! Keys: remaining uses of key items

use super::{Condition, ReadOnlyRepository, Record, Repository, RepositoryResult, WriteRepository};
use crate::database::{Database, DbResult};
use rusqlite::types::Value;
use rusqlite::Row;

/// 1:1 with an [`Item`](super::Item)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Key {
    pub item_id: i64,
    pub uses: i64,
}

impl Record for Key {
    const TABLE: &'static str = "keys";
    const COLUMNS: &'static [&'static str] = &["item_id", "uses"];
    const PRIMARY_KEY: &'static [&'static str] = &["item_id"];

    fn from_row(row: &Row<'_>) -> DbResult<Self> {
        Ok(Self {
            item_id: row.get(0)?,
            uses: row.get(1)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Integer(self.item_id), Value::Integer(self.uses)]
    }
}

/// Store for [`Key`]
#[derive(Clone)]
pub struct KeyRepository {
    db: Database,
}

impl KeyRepository {
    pub const ITEM_ID: &'static str = "item_id";

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn find_by_item_id(&self, item_id: i64) -> RepositoryResult<Option<Key>> {
        self.find_optional(&[Condition::eq(Self::ITEM_ID, item_id)])
    }

    pub fn exists_by_item_id(&self, item_id: i64) -> RepositoryResult<bool> {
        self.exists(&[Condition::eq(Self::ITEM_ID, item_id)])
    }
}

impl Repository for KeyRepository {
    type Record = Key;

    fn database(&self) -> &Database {
        &self.db
    }
}

impl ReadOnlyRepository for KeyRepository {}
impl WriteRepository for KeyRepository {}
