//! Destination table bootstrap for `SQLite`.
//!
//! The table layout is fixed: an identity `id`, a non-null `timestamp` and
//! `level`, and six nullable text columns. Identifiers come only from
//! [`TableName`], never from free text.

use logbatch_core::TableName;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::Result;

/// Data columns in insert order (everything except `id`).
pub const LOG_COLUMNS: [&str; 8] = [
    "timestamp",
    "level",
    "component",
    "process",
    "context",
    "type",
    "stack",
    "message",
];

/// Whether `table` exists. Names compare case-insensitively, as `SQLite`
/// identifiers do.
pub fn table_exists(conn: &Connection, table: &TableName) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        [table.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// DDL for the log table and its timestamp index.
pub fn create_table_sql(table: &TableName) -> String {
    let index = format!("\"idx_{}_timestamp\"", table.as_str());
    format!(
        "CREATE TABLE IF NOT EXISTS {t} (
             \"id\"        INTEGER PRIMARY KEY AUTOINCREMENT,
             \"timestamp\" TEXT NOT NULL,
             \"level\"     TEXT NOT NULL CHECK (length(\"level\") <= 16),
             \"component\" TEXT,
             \"process\"   TEXT,
             \"context\"   TEXT,
             \"type\"      TEXT,
             \"stack\"     TEXT,
             \"message\"   TEXT
         );
         CREATE INDEX IF NOT EXISTS {index} ON {t} (\"timestamp\");",
        t = table.quoted(),
    )
}

/// Check for `table` and create it if absent. Returns `true` if created.
pub fn ensure_log_table(conn: &Connection, table: &TableName) -> Result<bool> {
    if table_exists(conn, table)? {
        debug!(table = %table, "log table present");
        return Ok(false);
    }
    conn.execute_batch(&create_table_sql(table))?;
    info!(table = %table, "created log table");
    Ok(true)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
