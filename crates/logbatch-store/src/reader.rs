//! Read-only access to persisted log rows.

use std::fmt::Write as _;

use logbatch_core::{LogLevel, TableName};
use serde::Serialize;

use crate::connection::ConnectionPool;
use crate::errors::Result;

/// A row read back from the log table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLog {
    /// Identity column.
    pub id: i64,
    /// RFC 3339 timestamp as stored.
    pub timestamp: String,
    /// Severity.
    pub level: LogLevel,
    /// Emitting component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Emitting process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    /// Free-form context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Error type name.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Stack trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Filters for [`LogReader::query`].
#[derive(Clone, Debug)]
pub struct LogQuery {
    /// Only rows at this severity or above.
    pub min_level: Option<LogLevel>,
    /// Only rows from this component.
    pub component: Option<String>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Oldest first instead of newest first.
    pub ascending: bool,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            min_level: None,
            component: None,
            limit: 100,
            ascending: false,
        }
    }
}

/// Reads rows from one log table.
pub struct LogReader {
    pool: ConnectionPool,
    table: TableName,
}

impl LogReader {
    /// Create a reader over `table`.
    pub fn new(pool: ConnectionPool, table: TableName) -> Self {
        Self { pool, table }
    }

    /// Rows matching `q`, ordered by insertion.
    pub fn query(&self, q: &LogQuery) -> Result<Vec<StoredLog>> {
        let mut sql = format!(
            "SELECT \"id\", \"timestamp\", \"level\", \"component\", \"process\", \
             \"context\", \"type\", \"stack\", \"message\" FROM {} WHERE 1=1",
            self.table.quoted()
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(min) = q.min_level {
            let levels: Vec<&str> = LogLevel::ALL
                .iter()
                .filter(|l| **l >= min)
                .map(|l| l.as_str())
                .collect();
            let placeholders = vec!["?"; levels.len()].join(", ");
            let _ = write!(sql, " AND \"level\" IN ({placeholders})");
            for level in levels {
                params.push(Box::new(level));
            }
        }
        if let Some(ref component) = q.component {
            sql.push_str(" AND \"component\" = ?");
            params.push(Box::new(component.clone()));
        }

        let order = if q.ascending { "ASC" } else { "DESC" };
        let _ = write!(sql, " ORDER BY \"id\" {order} LIMIT ?");
        params.push(Box::new(i64::try_from(q.limit).unwrap_or(i64::MAX)));

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(AsRef::as_ref).collect();

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Total number of rows.
    pub fn count(&self) -> Result<u64> {
        let conn = self.pool.get()?;
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table.quoted()),
            [],
            |r| r.get(0),
        )?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}

fn row_to_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredLog> {
    let level: String = row.get(2)?;
    Ok(StoredLog {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        level: LogLevel::from_str_lossy(&level),
        component: row.get(3)?,
        process: row.get(4)?,
        context: row.get(5)?,
        error_type: row.get(6)?,
        stack: row.get(7)?,
        message: row.get(8)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::sqlite::SqliteStore;

    fn seeded() -> LogReader {
        let store = SqliteStore::in_memory().unwrap();
        let table = TableName::new("Logs").unwrap();
        {
            let conn = store.pool().get().unwrap();
            let _ = schema::ensure_log_table(&conn, &table).unwrap();
            conn.execute_batch(
                "INSERT INTO \"Logs\" (\"timestamp\", \"level\", \"component\", \"message\") VALUES
                    ('2025-01-15T12:00:00.000Z', 'Info', 'api', 'one'),
                    ('2025-01-15T12:00:01.000Z', 'Warning', 'db', 'two'),
                    ('2025-01-15T12:00:02.000Z', 'Error', 'api', 'three'),
                    ('2025-01-15T12:00:03.000Z', 'FatalError', NULL, 'four');",
            )
            .unwrap();
        }
        store.reader(table)
    }

    fn messages(rows: &[StoredLog]) -> Vec<&str> {
        rows.iter().filter_map(|r| r.message.as_deref()).collect()
    }

    #[test]
    fn newest_first_by_default() {
        let rows = seeded().query(&LogQuery::default()).unwrap();
        assert_eq!(messages(&rows), ["four", "three", "two", "one"]);
    }

    #[test]
    fn ascending_order() {
        let rows = seeded()
            .query(&LogQuery {
                ascending: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(messages(&rows), ["one", "two", "three", "four"]);
    }

    #[test]
    fn min_level_filter() {
        let rows = seeded()
            .query(&LogQuery {
                min_level: Some(LogLevel::Error),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(messages(&rows), ["four", "three"]);
        assert_eq!(rows[0].level, LogLevel::FatalError);
    }

    #[test]
    fn component_filter_and_limit() {
        let rows = seeded()
            .query(&LogQuery {
                component: Some("api".to_string()),
                limit: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(messages(&rows), ["three"]);
    }

    #[test]
    fn null_columns_read_as_none() {
        let rows = seeded().query(&LogQuery::default()).unwrap();
        assert!(rows[0].component.is_none());
        assert!(rows[0].stack.is_none());
    }

    #[test]
    fn count_rows() {
        assert_eq!(seeded().count().unwrap(), 4);
    }

    #[test]
    fn stored_log_serializes_type_column() {
        let log = StoredLog {
            id: 1,
            timestamp: "2025-01-15T12:00:00.000Z".to_string(),
            level: LogLevel::Error,
            component: None,
            process: None,
            context: None,
            error_type: Some("std::io::Error".to_string()),
            stack: None,
            message: Some("boom".to_string()),
        };
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["type"], "std::io::Error");
        assert!(json.get("component").is_none());
    }
}
