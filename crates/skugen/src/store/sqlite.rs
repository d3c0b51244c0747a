//! SQLite-backed cursor.
//!
//! Issuance is a read-modify-write of the single `sku_counter` row inside a
//! `BEGIN IMMEDIATE` transaction. The immediate transaction takes SQLite's
//! write lock up front, so a concurrent caller, in this process or another,
//! waits (up to the busy timeout) for the first one to commit instead of
//! reading the same value.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use super::{CounterStore, StoreConfig, StoreError};
use crate::sku::MAX_COUNT;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sku_counter (
    id         INTEGER PRIMARY KEY CHECK (id = 0),
    next_value INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS issued_skus (
    n          INTEGER PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
";

#[derive(Debug)]
pub struct SqliteCounterStore {
    path: PathBuf,
    config: StoreConfig,
    schema_ready: AtomicBool,
}

impl SqliteCounterStore {
    /// Does not touch the database; the first connection is made by
    /// [`ensure_schema`](CounterStore::ensure_schema) or
    /// [`next`](CounterStore::next).
    pub fn new<P: Into<PathBuf>>(path: P, config: StoreConfig) -> Self {
        Self {
            path: path.into(),
            config,
            schema_ready: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.config.busy_timeout)?;
        Ok(conn)
    }

    /// Schema creation is retried on every call until it succeeds once, so a
    /// database that was unreachable at startup is picked up by the first
    /// request.
    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.ensure_schema()
    }

    fn record_issued(&self, conn: &Connection, value: i64) {
        if !self.config.audit {
            return;
        }
        if let Err(err) = conn.execute("INSERT INTO issued_skus (n) VALUES (?1)", [value]) {
            tracing::warn!(value, error = %err, "audit insert failed");
        }
    }
}

impl CounterStore for SqliteCounterStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.config.validate()?;
        let mut conn = self.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA)?;
        let seeded = tx.execute(
            "INSERT OR IGNORE INTO sku_counter (id, next_value) VALUES (0, ?1)",
            [self.config.initial_value],
        )?;
        tx.commit()?;

        self.schema_ready.store(true, Ordering::Release);
        tracing::debug!(
            path = %self.path.display(),
            journal_mode = %mode,
            seeded = seeded == 1,
            "counter schema ready"
        );
        Ok(())
    }

    fn next(&self) -> Result<i64, StoreError> {
        self.ensure_ready()?;
        let mut conn = self.connect()?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: i64 =
            tx.query_row("SELECT next_value FROM sku_counter WHERE id = 0", [], |row| {
                row.get(0)
            })?;
        if current >= MAX_COUNT {
            // dropping the transaction rolls it back; nothing was written
            return Err(StoreError::SpaceExhausted { cursor: current });
        }
        tx.execute(
            "UPDATE sku_counter SET next_value = ?1 WHERE id = 0",
            [current + 1],
        )?;
        tx.commit()?;

        // `current` is spent from here on, whatever happens to the audit row.
        self.record_issued(&conn, current);
        Ok(current)
    }

    fn cursor(&self) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        conn.query_row("SELECT next_value FROM sku_counter WHERE id = 0", [], |row| {
            row.get(0)
        })
        .optional()?
        .ok_or_else(|| StoreError::Unavailable("counter has not been created".to_string()))
    }
}
