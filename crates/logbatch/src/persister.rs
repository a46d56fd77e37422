//! All-or-nothing batch insertion.
//!
//! One batch maps to one store transaction: every entry becomes one
//! parameterized `INSERT`, in drain order, through a single cached statement.
//! Any failure rolls the whole transaction back.

use std::sync::Arc;

use logbatch_core::{LogEntry, TableName};
use logbatch_store::schema::LOG_COLUMNS;
use logbatch_store::{LogStore, SqlValue, StoreError, StoreTransaction};
use tracing::{debug, warn};

use crate::errors::{PersistError, PersistPhase};

/// Writes drained batches to a [`LogStore`].
pub struct BatchPersister {
    store: Arc<dyn LogStore>,
    table: TableName,
    insert_sql: String,
}

impl BatchPersister {
    /// Persister targeting `table` in `store`.
    pub fn new(store: Arc<dyn LogStore>, table: TableName) -> Self {
        let insert_sql = insert_sql(&table);
        Self {
            store,
            table,
            insert_sql,
        }
    }

    /// Destination table.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Create the destination table if it is missing.
    pub fn ensure_schema(&self) -> Result<bool, StoreError> {
        self.store.ensure_table(&self.table)
    }

    /// Insert every entry in one transaction. Returns the number written.
    ///
    /// An empty batch is a no-op that opens no transaction.
    pub fn persist(&self, entries: &[LogEntry]) -> Result<usize, PersistError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let batch_size = entries.len();
        let fail = |phase, source| PersistError {
            phase,
            batch_size,
            source,
        };

        let mut tx = self
            .store
            .begin()
            .map_err(|e| fail(PersistPhase::Begin, e))?;

        for (index, entry) in entries.iter().enumerate() {
            let timestamp = entry.timestamp_rfc3339();
            let params = entry_params(entry, &timestamp);
            if let Err(e) = tx.execute(&self.insert_sql, &params) {
                rollback(tx, &self.table);
                return Err(fail(PersistPhase::Insert { index }, e));
            }
        }

        tx.commit().map_err(|e| fail(PersistPhase::Commit, e))?;
        debug!(table = %self.table, count = batch_size, "persisted batch");
        Ok(batch_size)
    }
}

fn rollback(tx: Box<dyn StoreTransaction>, table: &TableName) {
    if let Err(e) = tx.rollback() {
        warn!(table = %table, error = %e, "rollback after failed insert also failed");
    }
}

/// `INSERT INTO "T" ("timestamp", ...) VALUES (?, ...)` over [`LOG_COLUMNS`].
fn insert_sql(table: &TableName) -> String {
    let columns = LOG_COLUMNS
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; LOG_COLUMNS.len()].join(", ");
    format!(
        "INSERT INTO {} ({columns}) VALUES ({placeholders})",
        table.quoted()
    )
}

/// Bind values in [`LOG_COLUMNS`] order. Absent fields become SQL `NULL`.
fn entry_params<'a>(entry: &'a LogEntry, timestamp: &'a str) -> [SqlValue<'a>; 8] {
    [
        SqlValue::Text(timestamp),
        SqlValue::Text(entry.level().as_str()),
        entry.component().into(),
        entry.process().into(),
        entry.context().into(),
        entry.error_type().into(),
        entry.stack().into(),
        entry.message().into(),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use logbatch_core::LogLevel;
    use logbatch_store::{LogQuery, SqliteStore};

    use super::*;
    use crate::test_utils::RecordingStore;

    fn table() -> TableName {
        TableName::new("Logs").unwrap()
    }

    fn entry(msg: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info).with_message(msg)
    }

    fn sqlite() -> (SqliteStore, BatchPersister) {
        let store = SqliteStore::in_memory().unwrap();
        let persister = BatchPersister::new(Arc::new(store.clone()), table());
        let _ = persister.ensure_schema().unwrap();
        (store, persister)
    }

    #[test]
    fn insert_statement_lists_all_columns() {
        assert_eq!(
            insert_sql(&table()),
            "INSERT INTO \"Logs\" (\"timestamp\", \"level\", \"component\", \"process\", \
             \"context\", \"type\", \"stack\", \"message\") VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn empty_batch_opens_no_transaction() {
        let store = Arc::new(RecordingStore::new());
        let persister = BatchPersister::new(store.clone(), table());
        assert_eq!(persister.persist(&[]).unwrap(), 0);
        assert_eq!(store.transactions(), 0);
    }

    #[test]
    fn batch_is_one_transaction_in_order() {
        let store = Arc::new(RecordingStore::new());
        let persister = BatchPersister::new(store.clone(), table());
        let batch = vec![entry("a"), entry("b"), entry("c")];

        assert_eq!(persister.persist(&batch).unwrap(), 3);
        assert_eq!(store.transactions(), 1);
        assert_eq!(store.messages(), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn failed_insert_rolls_back_everything() {
        let store = Arc::new(RecordingStore::new());
        store.fail_next(1, 2);
        let persister = BatchPersister::new(store.clone(), table());
        let batch = vec![entry("a"), entry("b"), entry("c")];

        let err = persister.persist(&batch).unwrap_err();
        assert_eq!(err.phase, PersistPhase::Insert { index: 2 });
        assert_eq!(err.batch_size, 3);
        assert!(store.batches().is_empty());
        assert_eq!(store.rollbacks(), 1);
    }

    #[test]
    fn sqlite_round_trip_maps_absent_fields_to_null() {
        let (store, persister) = sqlite();
        let full = LogEntry::new(LogLevel::Error)
            .with_component("api")
            .with_process("worker-1")
            .with_context("req=42")
            .with_error_type("std::io::Error")
            .with_stack("frame 0")
            .with_message("boom");
        let bare = LogEntry::new(LogLevel::Info);

        assert_eq!(persister.persist(&[full, bare]).unwrap(), 2);

        let rows = store
            .reader(table())
            .query(&LogQuery {
                ascending: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].level, LogLevel::Error);
        assert_eq!(rows[0].component.as_deref(), Some("api"));
        assert_eq!(rows[0].error_type.as_deref(), Some("std::io::Error"));
        assert_eq!(rows[0].stack.as_deref(), Some("frame 0"));
        assert_eq!(rows[1].level, LogLevel::Info);
        assert!(rows[1].component.is_none());
        assert!(rows[1].message.is_none());

        let conn = store.pool().get().unwrap();
        let nulls: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM \"Logs\" WHERE \"process\" IS NULL AND \"context\" IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn sqlite_failure_leaves_no_partial_rows() {
        let (store, _) = sqlite();
        // Target a table that was never created: the first insert fails.
        let persister = BatchPersister::new(
            Arc::new(store.clone()),
            TableName::new("Missing").unwrap(),
        );
        let result = persister.persist(&[entry("a"), entry("b")]);
        assert_matches!(
            result,
            Err(PersistError {
                phase: PersistPhase::Insert { index: 0 },
                batch_size: 2,
                ..
            })
        );
        assert_eq!(store.reader(table()).count().unwrap(), 0);
        // Connection was released in a usable state.
        assert_eq!(persister.persist(&[]).unwrap(), 0);
        let ok = BatchPersister::new(Arc::new(store.clone()), table());
        assert_eq!(ok.persist(&[entry("c")]).unwrap(), 1);
    }

    #[test]
    fn timestamp_is_stored_as_rfc3339() {
        let (store, persister) = sqlite();
        let ts = chrono::DateTime::parse_from_rfc3339("2025-01-15T12:00:00.123Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let _ = persister
            .persist(&[entry("a").with_timestamp(ts)])
            .unwrap();
        let rows = store.reader(table()).query(&LogQuery::default()).unwrap();
        assert_eq!(rows[0].timestamp, "2025-01-15T12:00:00.123Z");
    }
}
