//! # logbatch
//!
//! Buffered log writer. Entries are held in a per-logger cache and written
//! to a relational store in batches, one transaction per batch.
//!
//! - [`LogCache`]: ordered in-memory buffer with an atomic drain
//! - [`BatchPersister`]: all-or-nothing insertion of a drained batch
//! - Flush scheduler: debounced background tick (internal, owned by the logger)
//! - [`Logger`]: write API (sync and async), explicit flush, termination
//!
//! A batch is flushed when the cache reaches `max_entries`, when a scheduler
//! tick finds the debounce window elapsed, on [`Logger::flush`], and once
//! more on [`Logger::terminate`] or drop.

#![deny(unsafe_code)]

pub mod cache;
pub mod errors;
mod flush;
pub mod logger;
pub mod persister;
mod scheduler;

#[cfg(test)]
mod test_utils;

pub use cache::LogCache;
pub use errors::{LoggerError, PersistError, PersistPhase, Result};
pub use flush::LoggerStats;
pub use logger::{Logger, LoggerConfig};
pub use persister::BatchPersister;

pub use logbatch_core::{ErrorDetails, LogEntry, LogLevel, TableName};
pub use logbatch_settings::{FailurePolicy, LoggerSettings};

/// Install the global diagnostics subscriber.
///
/// Human-readable output goes to stderr. `RUST_LOG` takes precedence over
/// `level`. Later calls are no-ops.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

/// Same as [`init_subscriber`] but emits one JSON object per line.
pub fn init_json_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();
}
