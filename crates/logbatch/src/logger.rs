//! Public logger facade.
//!
//! A [`Logger`] owns one cache, one scheduler, and a handle to the backing
//! store. Writes go to the cache; a write that fills the cache flushes before
//! returning. [`Logger::terminate`] (also run on drop) stops the scheduler and
//! flushes whatever is left.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use logbatch_core::{ErrorDetails, LogEntry, LogLevel, TableName};
use logbatch_settings::{FailurePolicy, LoggerSettings};
use logbatch_store::{ConnectionConfig, LogStore, SqliteStore};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::errors::{LoggerError, Result};
use crate::flush::{FlushEngine, FlushTrigger, LoggerStats};
use crate::persister::BatchPersister;
use crate::scheduler::{FlushScheduler, Schedule};

/// Shortest scheduler period accepted; `interval` rejects zero.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Runtime configuration for a [`Logger`].
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    /// Destination table.
    pub table: TableName,
    /// Cache size that triggers an immediate flush.
    pub max_entries: usize,
    /// Scheduler wake-up period.
    pub tick_interval: Duration,
    /// Minimum gap between scheduled flushes.
    pub min_flush_interval: Duration,
    /// Fate of a batch whose persist failed.
    pub failure_policy: FailurePolicy,
}

impl LoggerConfig {
    /// Config for `table` with every other value at its default.
    pub fn new(table: TableName) -> Self {
        let defaults = LoggerSettings::default();
        Self {
            table,
            max_entries: defaults.max_entries,
            tick_interval: defaults.tick_interval(),
            min_flush_interval: defaults.min_flush_interval(),
            failure_policy: defaults.failure_policy,
        }
    }

    /// Validated config from loaded settings.
    pub fn from_settings(settings: &LoggerSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            table: settings.table_name()?,
            max_entries: settings.max_entries,
            tick_interval: settings.tick_interval(),
            min_flush_interval: settings.min_flush_interval(),
            failure_policy: settings.failure_policy,
        })
    }
}

/// Buffered, batching log writer.
///
/// Not `Clone`: share it behind an `Arc`. Dropping the last handle
/// terminates it.
pub struct Logger {
    engine: Arc<FlushEngine>,
    scheduler: FlushScheduler,
    terminating: AtomicBool,
}

impl Logger {
    /// Start a logger on the current tokio runtime.
    ///
    /// Ensures the destination table exists, then starts the scheduler.
    pub fn new(store: Arc<dyn LogStore>, config: LoggerConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| LoggerError::NoRuntime)?;
        Self::with_runtime(store, config, &runtime)
    }

    /// Start a logger whose scheduler runs on `runtime`.
    pub fn with_runtime(
        store: Arc<dyn LogStore>,
        config: LoggerConfig,
        runtime: &Handle,
    ) -> Result<Self> {
        let max_entries = config.max_entries.max(1);
        let tick = config.tick_interval.max(MIN_TICK);
        let persister = BatchPersister::new(store, config.table.clone());
        let created = persister
            .ensure_schema()
            .map_err(|source| LoggerError::Schema {
                table: config.table.to_string(),
                source,
            })?;

        let engine = Arc::new(FlushEngine::new(
            persister,
            max_entries,
            config.failure_policy,
        ));
        let scheduler = FlushScheduler::start(
            Arc::clone(&engine),
            Schedule {
                tick,
                min_flush_interval: config.min_flush_interval,
            },
            runtime,
        );

        info!(
            table = %config.table,
            created,
            max_entries,
            tick_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX),
            "logger started"
        );
        Ok(Self {
            engine,
            scheduler,
            terminating: AtomicBool::new(false),
        })
    }

    /// Open the `SQLite` database named in `settings` and start a logger on it.
    pub fn open(settings: &LoggerSettings) -> Result<Self> {
        let config = LoggerConfig::from_settings(settings)?;
        let store = SqliteStore::open(
            &settings.database,
            &ConnectionConfig {
                pool_size: settings.pool_size,
                busy_timeout_ms: settings.busy_timeout_ms,
            },
        )?;
        Self::new(Arc::new(store), config)
    }

    /// Destination table.
    pub fn table(&self) -> &TableName {
        self.engine.persister().table()
    }

    /// Whether [`Logger::terminate`] has run.
    pub fn is_terminated(&self) -> bool {
        self.terminating.load(Ordering::SeqCst)
    }

    /// Counters snapshot.
    pub fn stats(&self) -> LoggerStats {
        self.engine.stats()
    }

    // ── writes ──────────────────────────────────────────────────────────

    /// Buffer `entry`; flush in the calling thread if the cache is full.
    ///
    /// A failed threshold flush is returned here, but `entry` itself was
    /// accepted.
    pub fn write(&self, entry: LogEntry) -> Result<()> {
        if self.accept(entry)? {
            let _ = self.engine.flush(FlushTrigger::Threshold)?;
        }
        Ok(())
    }

    /// Buffer `entry`; a threshold flush runs on the blocking pool.
    pub async fn write_async(&self, entry: LogEntry) -> Result<()> {
        if self.accept(entry)? {
            let _ = self.flush_on_pool(FlushTrigger::Threshold).await?;
        }
        Ok(())
    }

    /// Add to the cache unless terminated. Returns whether the threshold was
    /// reached.
    fn accept(&self, entry: LogEntry) -> Result<bool> {
        if self.is_terminated() {
            return Err(LoggerError::Terminated);
        }
        let full = self.engine.add(entry);
        // Lost the race with terminate: the terminal drain may already have
        // run, so persist this entry ourselves.
        if self.is_terminated() {
            let _ = self.engine.flush(FlushTrigger::Terminal)?;
            return Ok(false);
        }
        Ok(full)
    }

    /// Info entry.
    pub fn write_info(
        &self,
        component: Option<&str>,
        process: Option<&str>,
        context: Option<&str>,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.write(plain_entry(
            LogLevel::Info,
            component,
            process,
            context,
            message,
            timestamp,
        ))
    }

    /// Warning entry.
    pub fn write_warning(
        &self,
        component: Option<&str>,
        process: Option<&str>,
        context: Option<&str>,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.write(plain_entry(
            LogLevel::Warning,
            component,
            process,
            context,
            message,
            timestamp,
        ))
    }

    /// Error entry. The stored message is `"{message} - {error}"`.
    ///
    /// The `type` column holds the root cause's type name only when that
    /// cause is a recognized std, serde or chrono error; otherwise it holds
    /// `E`'s type name, since a `dyn Error` cannot report its concrete type.
    /// The stack is a call-site backtrace, present only when backtraces are
    /// enabled (`RUST_BACKTRACE` or `RUST_LIB_BACKTRACE`).
    pub fn write_error<E: Error + 'static>(
        &self,
        component: Option<&str>,
        process: Option<&str>,
        context: Option<&str>,
        message: &str,
        error: &E,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.write(error_entry(
            LogLevel::Error,
            component,
            process,
            context,
            message,
            error,
            timestamp,
        ))
    }

    /// Fatal error entry. Same shape as [`Logger::write_error`].
    pub fn write_fatal_error<E: Error + 'static>(
        &self,
        component: Option<&str>,
        process: Option<&str>,
        context: Option<&str>,
        message: &str,
        error: &E,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.write(error_entry(
            LogLevel::FatalError,
            component,
            process,
            context,
            message,
            error,
            timestamp,
        ))
    }

    /// Async form of [`Logger::write_info`].
    pub fn write_info_async(
        &self,
        component: Option<&str>,
        process: Option<&str>,
        context: Option<&str>,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<()>> + Send + '_ {
        let entry = plain_entry(
            LogLevel::Info,
            component,
            process,
            context,
            message,
            timestamp,
        );
        self.write_async(entry)
    }

    /// Async form of [`Logger::write_warning`].
    pub fn write_warning_async(
        &self,
        component: Option<&str>,
        process: Option<&str>,
        context: Option<&str>,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<()>> + Send + '_ {
        let entry = plain_entry(
            LogLevel::Warning,
            component,
            process,
            context,
            message,
            timestamp,
        );
        self.write_async(entry)
    }

    /// Async form of [`Logger::write_error`]. Error details are captured
    /// before the future is returned.
    pub fn write_error_async<E: Error + 'static>(
        &self,
        component: Option<&str>,
        process: Option<&str>,
        context: Option<&str>,
        message: &str,
        error: &E,
        timestamp: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<()>> + Send + '_ {
        let entry = error_entry(
            LogLevel::Error,
            component,
            process,
            context,
            message,
            error,
            timestamp,
        );
        self.write_async(entry)
    }

    /// Async form of [`Logger::write_fatal_error`].
    pub fn write_fatal_error_async<E: Error + 'static>(
        &self,
        component: Option<&str>,
        process: Option<&str>,
        context: Option<&str>,
        message: &str,
        error: &E,
        timestamp: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<()>> + Send + '_ {
        let entry = error_entry(
            LogLevel::FatalError,
            component,
            process,
            context,
            message,
            error,
            timestamp,
        );
        self.write_async(entry)
    }

    // ── flush / lifecycle ───────────────────────────────────────────────

    /// Persist everything buffered now. Returns the number of entries written.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.engine.flush(FlushTrigger::Explicit)?)
    }

    /// Async form of [`Logger::flush`].
    pub async fn flush_async(&self) -> Result<usize> {
        self.flush_on_pool(FlushTrigger::Explicit).await
    }

    async fn flush_on_pool(&self, trigger: FlushTrigger) -> Result<usize> {
        let engine = Arc::clone(&self.engine);
        Ok(tokio::task::spawn_blocking(move || engine.flush(trigger)).await??)
    }

    /// Stop the scheduler and flush what is left.
    ///
    /// Later calls do nothing unless entries are still pending, which happens
    /// when a failed final flush requeued its batch; those calls retry it.
    ///
    /// Blocks the calling thread for the final persist. Waits for a scheduled
    /// flush already in progress, but not for the scheduler task to exit.
    pub fn terminate(&self) -> Result<()> {
        if self.begin_terminate() {
            self.scheduler.stop();
        } else if self.engine.pending() == 0 {
            return Ok(());
        }
        let count = self.engine.flush(FlushTrigger::Terminal)?;
        info!(table = %self.table(), count, "logger terminated");
        Ok(())
    }

    /// Async form of [`Logger::terminate`]: the first call also waits for the
    /// scheduler task to exit before the final flush.
    pub async fn terminate_async(&self) -> Result<()> {
        if self.begin_terminate() {
            self.scheduler.stop();
            self.scheduler.join().await?;
        } else if self.engine.pending() == 0 {
            return Ok(());
        }
        let count = self.flush_on_pool(FlushTrigger::Terminal).await?;
        info!(table = %self.table(), count, "logger terminated");
        Ok(())
    }

    /// Mark the logger terminated. `true` only for the first caller.
    fn begin_terminate(&self) -> bool {
        !self.terminating.swap(true, Ordering::SeqCst)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("table", self.table())
            .field("terminated", &self.is_terminated())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.is_terminated() && self.engine.pending() == 0 {
            return;
        }
        debug!(table = %self.table(), "terminating logger on drop");
        if let Err(e) = self.terminate() {
            error!(error = %e, "final flush on drop failed");
        }
        let abandoned = self.engine.pending();
        if abandoned > 0 {
            warn!(table = %self.table(), count = abandoned, "abandoning unpersisted entries on drop");
        }
    }
}

fn plain_entry(
    level: LogLevel,
    component: Option<&str>,
    process: Option<&str>,
    context: Option<&str>,
    message: &str,
    timestamp: Option<DateTime<Utc>>,
) -> LogEntry {
    let mut entry = LogEntry::new(level).with_message(message);
    if let Some(ts) = timestamp {
        entry = entry.with_timestamp(ts);
    }
    if let Some(c) = component {
        entry = entry.with_component(c);
    }
    if let Some(p) = process {
        entry = entry.with_process(p);
    }
    if let Some(c) = context {
        entry = entry.with_context(c);
    }
    entry
}

fn error_entry<E: Error + 'static>(
    level: LogLevel,
    component: Option<&str>,
    process: Option<&str>,
    context: Option<&str>,
    message: &str,
    error: &E,
    timestamp: Option<DateTime<Utc>>,
) -> LogEntry {
    let details = ErrorDetails::capture(error);
    plain_entry(level, component, process, context, message, timestamp).with_error(message, &details)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
