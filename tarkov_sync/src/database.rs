//! SQLite handle and schema for tarkov_sync
//!
//! Uses parameterized queries exclusively (no SQL string concatenation of values).
//! The connection is shared behind a mutex; every repository holds a clone of
//! the same [`Database`].

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Result type for raw database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Sequence backing `items.id`
pub const ITEM_ID_SEQ: &str = "item_id_seq";
/// Sequence backing `key_reports.id`
pub const KEY_REPORT_ID_SEQ: &str = "key_report_id_seq";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared, thread-safe database connection
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and initialise the schema
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        log::info!("Opened database: {}", path.display());
        Self::from_connection(conn)
    }

    /// Fresh in-memory database, used by tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied
        // statement behind: SQLite rolls back the open transaction on drop.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the connection outside of an explicit transaction
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let conn = self.lock();
        f(&conn)
    }

    /// Run `f` inside an IMMEDIATE transaction, committing on success
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> DbResult<T>) -> DbResult<T> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `sequences`: named monotonic counters for identity allocation
/// - `items`: one row per external item, keyed by `tarkov_id`
/// - `item_prices`: append-only flea price snapshots per game mode
/// - `keys`: remaining uses for key items
/// - `key_reports` / `loot_reports`: user-submitted loot reports
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sequences (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );

        INSERT OR IGNORE INTO sequences (name, value) VALUES ('item_id_seq', 0);
        INSERT OR IGNORE INTO sequences (name, value) VALUES ('key_report_id_seq', 0);

        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY,
            tarkov_id TEXT NOT NULL UNIQUE,
            market_id TEXT,
            name TEXT NOT NULL,
            short_name TEXT,
            icon_link TEXT,
            wiki_link TEXT,
            market_link TEXT,
            horizontal_slots INTEGER NOT NULL DEFAULT 1,
            vertical_slots INTEGER NOT NULL DEFAULT 1,
            slots INTEGER,
            tags TEXT NOT NULL DEFAULT '[]',
            trader_name TEXT,
            trader_price INTEGER NOT NULL DEFAULT 0,
            trader_currency TEXT NOT NULL DEFAULT '₽',
            pvp_flea_price INTEGER,
            pvp_banned_on_flea INTEGER NOT NULL DEFAULT 0,
            pve_flea_price INTEGER,
            pve_banned_on_flea INTEGER NOT NULL DEFAULT 0,
            last_update TEXT NOT NULL
        );

        -- Composite uniqueness: one snapshot per item, mode and source timestamp
        CREATE TABLE IF NOT EXISTS item_prices (
            item_id INTEGER NOT NULL,
            mode TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            flea_price INTEGER,
            banned_on_flea INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (item_id, mode, timestamp),
            FOREIGN KEY (item_id) REFERENCES items(id)
        );

        CREATE INDEX IF NOT EXISTS idx_item_prices_timestamp ON item_prices(timestamp);

        CREATE TABLE IF NOT EXISTS keys (
            item_id INTEGER PRIMARY KEY,
            uses INTEGER NOT NULL,
            FOREIGN KEY (item_id) REFERENCES items(id)
        );

        CREATE TABLE IF NOT EXISTS key_reports (
            id INTEGER PRIMARY KEY,
            reported_by INTEGER NOT NULL,
            key_id INTEGER NOT NULL,
            game_mode TEXT NOT NULL,
            reported_at TEXT NOT NULL,
            FOREIGN KEY (key_id) REFERENCES keys(item_id)
        );

        CREATE INDEX IF NOT EXISTS idx_key_reports_key ON key_reports(key_id);

        CREATE TABLE IF NOT EXISTS loot_reports (
            key_report_id INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            count INTEGER NOT NULL CHECK (count > 0),
            PRIMARY KEY (key_report_id, item_id),
            FOREIGN KEY (key_report_id) REFERENCES key_reports(id),
            FOREIGN KEY (item_id) REFERENCES items(id)
        );
        ",
    )?;

    log::debug!("Database schema initialized");
    Ok(())
}

/// Draw the next value of a named sequence inside `tx`
pub fn next_sequence_value(tx: &Transaction<'_>, sequence: &str) -> DbResult<i64> {
    tx.query_row(
        "UPDATE sequences SET value = value + 1 WHERE name = ?1 RETURNING value",
        params![sequence],
        |row| row.get(0),
    )
}

/// Timestamps are stored with fixed nanosecond precision so that text order
/// equals time order and values round-trip exactly.
pub fn timestamp_value(ts: &DateTime<Utc>) -> Value {
    Value::Text(ts.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

/// Decode a timestamp column written by [`timestamp_value`]
pub fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> DbResult<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Get total count of rows in a table
pub fn table_count(conn: &Connection, table: &str) -> DbResult<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
}
