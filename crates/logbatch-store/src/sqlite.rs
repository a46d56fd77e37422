//! Pooled `SQLite` implementation of [`LogStore`].
//!
//! A [`SqliteTransaction`] owns its pooled connection for the life of the
//! unit of work and drives `BEGIN` / `COMMIT` / `ROLLBACK` explicitly, so it
//! can be handed out as a `Box<dyn StoreTransaction>` without borrowing the
//! store.

use std::path::Path;

use logbatch_core::TableName;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use tracing::warn;

use crate::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::errors::Result;
use crate::reader::LogReader;
use crate::schema;
use crate::{LogStore, SqlValue, StoreTransaction};

impl ToSql for SqlValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match *self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(i)),
        })
    }
}

/// `SQLite` backing store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        Ok(Self {
            pool: connection::new_file(path, config)?,
        })
    }

    /// Single-connection in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            pool: connection::new_in_memory(&ConnectionConfig::default())?,
        })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Reader for rows persisted to `table`.
    pub fn reader(&self, table: TableName) -> LogReader {
        LogReader::new(self.pool.clone(), table)
    }
}

impl LogStore for SqliteStore {
    fn ensure_table(&self, table: &TableName) -> Result<bool> {
        let conn = self.pool.get()?;
        schema::ensure_log_table(&conn, table)
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let conn = self.pool.get()?;
        Ok(Box::new(SqliteTransaction::begin(conn)?))
    }
}

/// An open `SQLite` transaction on a pooled connection.
pub struct SqliteTransaction {
    conn: PooledConnection,
    open: bool,
}

impl SqliteTransaction {
    fn begin(conn: PooledConnection) -> Result<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Self { conn, open: true })
    }
}

impl StoreTransaction for SqliteTransaction {
    fn execute(&mut self, sql: &str, params: &[SqlValue<'_>]) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.execute(rusqlite::params_from_iter(params.iter()))?)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        self.open = false;
        Ok(())
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback of abandoned transaction failed");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
