//! In-memory buffer of pending entries.
//!
//! Each [`LogCache`] owns its own lock. The lock guards only the vector
//! itself: `add` pushes, `drain` swaps the whole vector out. No I/O ever runs
//! while it is held.

use logbatch_core::LogEntry;
use parking_lot::Mutex;

/// Insertion-ordered, thread-safe buffer of entries awaiting a flush.
///
/// There is no eviction: entries leave only through [`LogCache::drain`].
pub struct LogCache {
    entries: Mutex<Vec<LogEntry>>,
    capacity_hint: usize,
}

impl LogCache {
    /// Create an empty cache that pre-allocates room for `capacity_hint`
    /// entries after every drain.
    pub fn new(capacity_hint: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity_hint)),
            capacity_hint,
        }
    }

    /// Append `entry` and return the size after insertion.
    pub fn add(&self, entry: LogEntry) -> usize {
        let mut entries = self.entries.lock();
        entries.push(entry);
        entries.len()
    }

    /// Current number of entries. Advisory: may be stale on return.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is currently empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove and return everything, oldest first, leaving the cache empty.
    pub fn drain(&self) -> Vec<LogEntry> {
        let fresh = Vec::with_capacity(self.capacity_hint);
        std::mem::replace(&mut *self.entries.lock(), fresh)
    }

    /// Put a previously drained batch back in front of anything added since.
    pub fn requeue(&self, mut batch: Vec<LogEntry>) {
        if batch.is_empty() {
            return;
        }
        let mut entries = self.entries.lock();
        batch.append(&mut entries);
        *entries = batch;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
