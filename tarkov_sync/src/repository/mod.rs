//! Condition-parameterised access to tables
//!
//! Three capability tiers, each its own trait over a common [`Repository`]
//! base so a store implements exactly the tiers it needs:
//!
//! - [`ReadOnlyRepository`]: `read`, `find`, `find_optional`, `exists`, `count`
//! - [`WriteRepository`]: `insert`, `update`, `delete`
//! - [`SequencedWriteRepository`]: `insert_with_id` and the id-keyed helpers
//!
//! Writes take a *mutator*: a pure `R -> R` transform. `insert` applies it to
//! a default record, `update` applies it to every currently matching row and
//! persists the results as one transaction, so the new values may depend on
//! the old ones.

mod condition;
mod item_prices;
mod items;
mod keys;
mod reports;

pub use condition::{describe, where_clause, Condition};
pub use item_prices::{ItemPrice, ItemPriceRepository};
pub use items::{Item, ItemRepository};
pub use keys::{Key, KeyRepository};
pub use reports::{KeyReport, KeyReportRepository, LootReport, LootReportRepository};

use crate::database::{next_sequence_value, Database, DbResult};
use crate::error::RepositoryError;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row, Transaction};

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// A row type mapped onto one table
pub trait Record: Sized + Clone + Default {
    const TABLE: &'static str;
    /// Every column, in the order of [`Record::to_values`]
    const COLUMNS: &'static [&'static str];
    /// Columns identifying a row; used to write back updated rows
    const PRIMARY_KEY: &'static [&'static str];

    /// Decode a row selected with `COLUMNS` in order
    fn from_row(row: &Row<'_>) -> DbResult<Self>;

    /// Encode all columns, in `COLUMNS` order
    fn to_values(&self) -> Vec<Value>;

    /// Values of the primary-key columns, in column order
    fn primary_key_values(&self) -> Vec<Value> {
        Self::COLUMNS
            .iter()
            .zip(self.to_values())
            .filter(|(column, _)| Self::PRIMARY_KEY.contains(*column))
            .map(|(_, value)| value)
            .collect()
    }
}

/// A record whose identity is drawn from a database sequence
pub trait SequencedRecord: Record {
    const SEQUENCE: &'static str;
    const ID_COLUMN: &'static str;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);
}

/// Base of every capability tier: a database and the record it stores
pub trait Repository {
    type Record: Record;

    fn database(&self) -> &Database;
}

/// Read capability
pub trait ReadOnlyRepository: Repository {
    /// All rows matching every condition, ordered by primary key
    fn read(&self, conditions: &[Condition]) -> RepositoryResult<Vec<Self::Record>> {
        log::trace!(
            "Reading {} rows where {}",
            Self::Record::TABLE,
            describe(conditions)
        );
        let rows = self
            .database()
            .with_connection(|conn| select_rows::<Self::Record>(conn, conditions))?;
        log::trace!("Read {} {} rows", rows.len(), Self::Record::TABLE);
        Ok(rows)
    }

    fn read_all(&self) -> RepositoryResult<Vec<Self::Record>> {
        self.read(&[])
    }

    /// Exactly one matching row
    fn find(&self, conditions: &[Condition]) -> RepositoryResult<Self::Record> {
        let mut rows = self.read(conditions)?;
        match rows.len() {
            0 => Err(RepositoryError::NotFound {
                table: Self::Record::TABLE,
                conditions: describe(conditions),
            }),
            1 => Ok(rows.remove(0)),
            count => Err(RepositoryError::Ambiguous {
                table: Self::Record::TABLE,
                conditions: describe(conditions),
                count,
            }),
        }
    }

    /// Zero or one matching row
    fn find_optional(&self, conditions: &[Condition]) -> RepositoryResult<Option<Self::Record>> {
        match self.find(conditions) {
            Ok(row) => Ok(Some(row)),
            Err(RepositoryError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, conditions: &[Condition]) -> RepositoryResult<bool> {
        let mut params = Vec::new();
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
            Self::Record::TABLE,
            where_clause(conditions, &mut params)
        );
        let exists = self.database().with_connection(|conn| {
            conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
        })?;
        Ok(exists)
    }

    fn count(&self, conditions: &[Condition]) -> RepositoryResult<usize> {
        let mut params = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            Self::Record::TABLE,
            where_clause(conditions, &mut params)
        );
        let count: i64 = self.database().with_connection(|conn| {
            conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
        })?;
        Ok(count as usize)
    }
}

/// Write capability
pub trait WriteRepository: Repository {
    /// Insert `mutate(R::default())`, returning the number of rows written
    fn insert<F>(&self, mutate: F) -> RepositoryResult<usize>
    where
        F: FnOnce(Self::Record) -> Self::Record,
    {
        let record = mutate(Self::Record::default());
        let written = self
            .database()
            .with_connection(|conn| insert_row(conn, &record))?;
        log::trace!("Inserted {} {} row(s)", written, Self::Record::TABLE);
        Ok(written)
    }

    /// Read-transform-write every matching row in one transaction
    fn update<F>(&self, mutate: F, conditions: &[Condition]) -> RepositoryResult<usize>
    where
        F: Fn(Self::Record) -> Self::Record,
    {
        log::debug!(
            "Updating {} rows where {}",
            Self::Record::TABLE,
            describe(conditions)
        );
        let updated = self.database().transaction(|tx| {
            let rows = select_rows::<Self::Record>(tx, conditions)?;
            let mut updated = 0;
            for row in rows {
                let key = row.primary_key_values();
                updated += update_row(tx, &mutate(row), &key)?;
            }
            Ok(updated)
        })?;
        Ok(updated)
    }

    fn delete(&self, conditions: &[Condition]) -> RepositoryResult<usize> {
        log::debug!(
            "Deleting {} rows where {}",
            Self::Record::TABLE,
            describe(conditions)
        );
        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            Self::Record::TABLE,
            where_clause(conditions, &mut params)
        );
        let deleted = self
            .database()
            .with_connection(|conn| conn.execute(&sql, params_from_iter(params.iter())))?;
        Ok(deleted)
    }
}

/// Write capability for records with sequence-drawn identities
pub trait SequencedWriteRepository: Repository
where
    Self::Record: SequencedRecord,
{
    /// Draw the next identity, seed a record with it, apply `mutate` and
    /// insert, all in one transaction. The identity is never visible
    /// without its row.
    fn insert_with_id<F>(&self, mutate: F) -> RepositoryResult<i64>
    where
        F: FnOnce(Self::Record) -> Self::Record,
    {
        let id = self
            .database()
            .transaction(|tx| insert_sequenced::<Self::Record, F>(tx, mutate))?;
        log::trace!("Inserted {} row with id {}", Self::Record::TABLE, id);
        Ok(id)
    }

    fn find_by_id(&self, id: i64) -> RepositoryResult<Self::Record> {
        let conditions = [Condition::eq(Self::Record::ID_COLUMN, id)];
        let mut rows = self
            .database()
            .with_connection(|conn| select_rows::<Self::Record>(conn, &conditions))?;
        match rows.pop() {
            Some(row) => Ok(row),
            None => Err(RepositoryError::NotFound {
                table: Self::Record::TABLE,
                conditions: describe(&conditions),
            }),
        }
    }

    fn update_by_id<F>(&self, mutate: F, id: i64) -> RepositoryResult<usize>
    where
        F: Fn(Self::Record) -> Self::Record,
    {
        log::debug!("Updating {} row with id {}", Self::Record::TABLE, id);
        let conditions = [Condition::eq(Self::Record::ID_COLUMN, id)];
        let updated = self.database().transaction(|tx| {
            let mut updated = 0;
            for row in select_rows::<Self::Record>(tx, &conditions)? {
                let key = row.primary_key_values();
                updated += update_row(tx, &mutate(row), &key)?;
            }
            Ok(updated)
        })?;
        Ok(updated)
    }

    fn delete_by_id(&self, id: i64) -> RepositoryResult<usize> {
        log::debug!("Deleting {} row with id {}", Self::Record::TABLE, id);
        let deleted = self.database().with_connection(|conn| {
            conn.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1",
                    Self::Record::TABLE,
                    Self::Record::ID_COLUMN
                ),
                [id],
            )
        })?;
        Ok(deleted)
    }
}

fn column_list<R: Record>() -> String {
    R::COLUMNS.join(", ")
}

fn order_by<R: Record>() -> String {
    R::PRIMARY_KEY.join(", ")
}

pub(crate) fn select_rows<R: Record>(
    conn: &Connection,
    conditions: &[Condition],
) -> DbResult<Vec<R>> {
    let mut params = Vec::new();
    let sql = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {}",
        column_list::<R>(),
        R::TABLE,
        where_clause(conditions, &mut params),
        order_by::<R>()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows: DbResult<Vec<R>> = stmt
        .query_map(params_from_iter(params.iter()), R::from_row)?
        .collect();
    rows
}

/// Draw the next identity of `R`'s sequence and insert `mutate(seed)` on `tx`.
/// The mutator cannot replace the drawn identity.
pub(crate) fn insert_sequenced<R, F>(tx: &Transaction<'_>, mutate: F) -> DbResult<i64>
where
    R: SequencedRecord,
    F: FnOnce(R) -> R,
{
    let id = next_sequence_value(tx, R::SEQUENCE)?;
    let mut seed = R::default();
    seed.set_id(id);
    let mut record = mutate(seed);
    if record.id() != id {
        log::warn!(
            "Mutator changed sequenced {} id {} to {}, restoring",
            R::TABLE,
            id,
            record.id()
        );
        record.set_id(id);
    }
    insert_row(tx, &record)?;
    Ok(id)
}

pub(crate) fn insert_row<R: Record>(conn: &Connection, record: &R) -> DbResult<usize> {
    let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::TABLE,
        column_list::<R>(),
        placeholders.join(", ")
    );
    conn.prepare_cached(&sql)?
        .execute(params_from_iter(record.to_values()))
}

fn update_row<R: Record>(conn: &Connection, record: &R, key: &[Value]) -> DbResult<usize> {
    let assignments: Vec<String> = R::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", column, i + 1))
        .collect();
    let offset = R::COLUMNS.len();
    let key_match: Vec<String> = R::COLUMNS
        .iter()
        .filter(|column| R::PRIMARY_KEY.contains(*column))
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", column, offset + i + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        R::TABLE,
        assignments.join(", "),
        key_match.join(" AND ")
    );
    let mut values = record.to_values();
    values.extend(key.iter().cloned());
    conn.prepare_cached(&sql)?.execute(params_from_iter(values))
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
