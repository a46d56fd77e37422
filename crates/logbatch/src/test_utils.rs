//! In-memory [`LogStore`] that records what was committed.

use std::sync::Arc;

use logbatch_core::TableName;
use logbatch_store::{LogStore, Result, SqlValue, StoreError, StoreTransaction};
use parking_lot::Mutex;

/// One inserted row as bound values (`None` for SQL `NULL`).
pub type RecordedRow = Vec<Option<String>>;

/// Position of the `message` column in a [`RecordedRow`].
const MESSAGE: usize = 7;

#[derive(Default)]
struct State {
    committed: Vec<Vec<RecordedRow>>,
    tables: Vec<String>,
    transactions: usize,
    rollbacks: usize,
    failing_transactions: usize,
    fail_at_statement: usize,
    fail_begin: bool,
    fail_ensure: bool,
}

/// A [`LogStore`] that keeps committed batches in memory and can be told to
/// fail.
#[derive(Clone, Default)]
pub struct RecordingStore {
    state: Arc<Mutex<State>>,
}

impl RecordingStore {
    /// Store that succeeds at everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose `ensure_table` always fails.
    pub fn failing_ensure() -> Self {
        let store = Self::new();
        store.state.lock().fail_ensure = true;
        store
    }

    /// Make the next `count` transactions fail at statement `at_statement`.
    pub fn fail_next(&self, count: usize, at_statement: usize) {
        let mut state = self.state.lock();
        state.failing_transactions = count;
        state.fail_at_statement = at_statement;
    }

    /// Make every `begin` fail until reset with `false`.
    pub fn set_fail_begin(&self, fail: bool) {
        self.state.lock().fail_begin = fail;
    }

    /// Committed batches, oldest first.
    pub fn batches(&self) -> Vec<Vec<RecordedRow>> {
        self.state.lock().committed.clone()
    }

    /// `message` column of every committed row, grouped by batch.
    pub fn messages(&self) -> Vec<Vec<String>> {
        self.state
            .lock()
            .committed
            .iter()
            .map(|batch| {
                batch
                    .iter()
                    .map(|row| row[MESSAGE].clone().unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// Every committed message in commit order.
    pub fn all_messages(&self) -> Vec<String> {
        self.messages().into_iter().flatten().collect()
    }

    /// Transactions opened so far.
    pub fn transactions(&self) -> usize {
        self.state.lock().transactions
    }

    /// Explicit rollbacks so far.
    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }

    /// Tables passed to `ensure_table`.
    pub fn ensured_tables(&self) -> Vec<String> {
        self.state.lock().tables.clone()
    }
}

impl LogStore for RecordingStore {
    fn ensure_table(&self, table: &TableName) -> Result<bool> {
        let mut state = self.state.lock();
        if state.fail_ensure {
            return Err(StoreError::Other("permission denied".into()));
        }
        let created = !state.tables.iter().any(|t| t == table.as_str());
        if created {
            state.tables.push(table.as_str().to_string());
        }
        Ok(created)
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let mut state = self.state.lock();
        if state.fail_begin {
            return Err(StoreError::Other("store unavailable".into()));
        }
        state.transactions += 1;
        let fail_at = if state.failing_transactions > 0 {
            state.failing_transactions -= 1;
            Some(state.fail_at_statement)
        } else {
            None
        };
        Ok(Box::new(RecordingTransaction {
            state: Arc::clone(&self.state),
            rows: Vec::new(),
            fail_at,
        }))
    }
}

struct RecordingTransaction {
    state: Arc<Mutex<State>>,
    rows: Vec<RecordedRow>,
    fail_at: Option<usize>,
}

impl StoreTransaction for RecordingTransaction {
    fn execute(&mut self, _sql: &str, params: &[SqlValue<'_>]) -> Result<usize> {
        if self.fail_at == Some(self.rows.len()) {
            return Err(StoreError::Other("constraint violation".into()));
        }
        let row = params
            .iter()
            .map(|p| match p {
                SqlValue::Null => None,
                SqlValue::Text(s) => Some((*s).to_string()),
                SqlValue::Integer(i) => Some(i.to_string()),
            })
            .collect();
        self.rows.push(row);
        Ok(1)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.state.lock().committed.push(this.rows);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.state.lock().rollbacks += 1;
        Ok(())
    }
}
