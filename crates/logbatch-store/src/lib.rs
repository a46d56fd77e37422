//! # logbatch-store
//!
//! The capability set the batch persister depends on, plus a `SQLite`
//! implementation of it.
//!
//! - [`LogStore`]: ensure the destination table, begin a unit of work
//! - [`StoreTransaction`]: execute a parameterized statement, commit, roll back
//! - [`SqliteStore`]: pooled `SQLite` store (`r2d2` + `rusqlite`)
//! - [`LogReader`]: read persisted rows back

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod reader;
pub mod schema;
pub mod sqlite;

pub use connection::{ConnectionConfig, ConnectionPool};
pub use errors::{Result, StoreError};
pub use reader::{LogQuery, LogReader, StoredLog};
pub use sqlite::{SqliteStore, SqliteTransaction};

use logbatch_core::TableName;

/// A positional statement parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlValue<'a> {
    /// SQL `NULL`.
    Null,
    /// Text.
    Text(&'a str),
    /// 64-bit integer.
    Integer(i64),
}

impl<'a> From<Option<&'a str>> for SqlValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(Self::Null, SqlValue::Text)
    }
}

impl<'a> From<&'a str> for SqlValue<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

/// A relational backing store for log rows.
pub trait LogStore: Send + Sync {
    /// Make sure `table` exists with the log-row layout, creating it if absent.
    ///
    /// Returns `true` when the table was created by this call.
    fn ensure_table(&self, table: &TableName) -> Result<bool>;

    /// Open a transactional unit of work.
    fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// One open transaction.
///
/// Dropping a transaction without committing rolls it back.
pub trait StoreTransaction {
    /// Execute one statement with positional parameters; returns affected rows.
    fn execute(&mut self, sql: &str, params: &[SqlValue<'_>]) -> Result<usize>;

    /// Make every statement executed so far durable.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every statement executed so far.
    fn rollback(self: Box<Self>) -> Result<()>;
}
