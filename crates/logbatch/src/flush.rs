//! Shared flush path for threshold, scheduled, explicit, and terminal flushes.
//!
//! Flushes are serialized by a per-logger lock held across drain and
//! persist. The cache lock is taken only for the drain itself, so writers
//! never wait on I/O.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use logbatch_core::LogEntry;
use logbatch_settings::FailurePolicy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::LogCache;
use crate::errors::PersistError;
use crate::persister::BatchPersister;

/// What started a flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The cache reached its size threshold.
    Threshold,
    /// A scheduler tick found the debounce window elapsed.
    Scheduled,
    /// A caller asked for it.
    Explicit,
    /// Final flush during termination.
    Terminal,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Threshold => "threshold",
            Self::Scheduled => "scheduled",
            Self::Explicit => "explicit",
            Self::Terminal => "terminal",
        })
    }
}

/// Point-in-time counters for one logger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoggerStats {
    /// Entries currently buffered.
    pub pending: usize,
    /// Flushes that committed at least one entry.
    pub flushes: u64,
    /// Entries committed.
    pub persisted: u64,
    /// Flushes whose persist failed.
    pub failed_flushes: u64,
    /// Entries dropped after a failed persist.
    pub discarded: u64,
    /// Entries pushed back into the cache after a failed persist.
    pub requeued: u64,
}

#[derive(Default)]
struct Counters {
    flushes: AtomicU64,
    persisted: AtomicU64,
    failed_flushes: AtomicU64,
    discarded: AtomicU64,
    requeued: AtomicU64,
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Cache, persister, and the state that ties them together.
pub(crate) struct FlushEngine {
    cache: LogCache,
    persister: BatchPersister,
    policy: FailurePolicy,
    max_entries: usize,
    /// Serializes flushes. Holds the start of the last scheduled flush that
    /// drained something (`None` before the first).
    last_scheduled: Mutex<Option<Instant>>,
    counters: Counters,
}

impl FlushEngine {
    pub(crate) fn new(persister: BatchPersister, max_entries: usize, policy: FailurePolicy) -> Self {
        Self {
            cache: LogCache::new(max_entries),
            persister,
            policy,
            max_entries,
            last_scheduled: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    pub(crate) fn persister(&self) -> &BatchPersister {
        &self.persister
    }

    /// Buffer `entry`. Returns `true` when the cache reached the threshold.
    pub(crate) fn add(&self, entry: LogEntry) -> bool {
        self.cache.add(entry) >= self.max_entries
    }

    /// Entries currently buffered.
    pub(crate) fn pending(&self) -> usize {
        self.cache.len()
    }

    /// Drain and persist everything currently buffered.
    ///
    /// Returns the number of entries committed; zero when the cache was empty.
    pub(crate) fn flush(&self, trigger: FlushTrigger) -> Result<usize, PersistError> {
        let _serial = self.last_scheduled.lock();
        let batch = self.cache.drain();
        self.persist_batch(trigger, batch)
    }

    /// Run one scheduler tick at `now`.
    ///
    /// Flushes only if no scheduled flush happened within `min_interval` and
    /// the drain under the flush lock yields something. The window moves only
    /// when a non-empty batch was taken. Returns `None` when the tick was a
    /// no-op.
    pub(crate) fn on_tick(
        &self,
        now: Instant,
        min_interval: Duration,
    ) -> Option<Result<usize, PersistError>> {
        let mut last = self.last_scheduled.lock();
        let due = last.is_none_or(|t| now.saturating_duration_since(t) >= min_interval);
        if !due {
            return None;
        }
        let batch = self.cache.drain();
        if batch.is_empty() {
            return None;
        }
        *last = Some(last.map_or(now, |t| t.max(now)));
        Some(self.persist_batch(FlushTrigger::Scheduled, batch))
    }

    /// Persist a drained batch and apply the failure policy. Callers hold
    /// the flush lock.
    fn persist_batch(
        &self,
        trigger: FlushTrigger,
        batch: Vec<LogEntry>,
    ) -> Result<usize, PersistError> {
        if batch.is_empty() {
            return Ok(0);
        }

        match self.persister.persist(&batch) {
            Ok(n) => {
                let _ = self.counters.flushes.fetch_add(1, Ordering::Relaxed);
                let _ = self.counters.persisted.fetch_add(count(n), Ordering::Relaxed);
                debug!(%trigger, count = n, table = %self.persister.table(), "flushed");
                Ok(n)
            }
            Err(e) => {
                let _ = self.counters.failed_flushes.fetch_add(1, Ordering::Relaxed);
                let lost = batch.len();
                match self.policy {
                    FailurePolicy::Discard => {
                        let _ = self.counters.discarded.fetch_add(count(lost), Ordering::Relaxed);
                        warn!(%trigger, count = lost, error = %e, "discarding batch after failed persist");
                    }
                    FailurePolicy::Requeue => {
                        let _ = self.counters.requeued.fetch_add(count(lost), Ordering::Relaxed);
                        self.cache.requeue(batch);
                        warn!(%trigger, count = lost, error = %e, "requeued batch after failed persist");
                    }
                }
                Err(e)
            }
        }
    }

    pub(crate) fn stats(&self) -> LoggerStats {
        let c = &self.counters;
        LoggerStats {
            pending: self.cache.len(),
            flushes: c.flushes.load(Ordering::Relaxed),
            persisted: c.persisted.load(Ordering::Relaxed),
            failed_flushes: c.failed_flushes.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
            requeued: c.requeued.load(Ordering::Relaxed),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
