//! Error types for the logger engine.

use std::fmt;

use logbatch_settings::SettingsError;
use logbatch_store::StoreError;
use thiserror::Error;

/// Which step of the batch transaction failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistPhase {
    /// Opening the transaction.
    Begin,
    /// Inserting the entry at this position in the batch.
    Insert {
        /// Zero-based position of the failing entry.
        index: usize,
    },
    /// Committing.
    Commit,
}

impl fmt::Display for PersistPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin => f.write_str("begin"),
            Self::Insert { index } => write!(f, "insert #{index}"),
            Self::Commit => f.write_str("commit"),
        }
    }
}

/// A batch could not be persisted. Nothing from it was committed.
#[derive(Debug, Error)]
#[error("failed to persist batch of {batch_size} entries at {phase}: {source}")]
pub struct PersistError {
    /// Step that failed.
    pub phase: PersistPhase,
    /// Number of entries in the batch.
    pub batch_size: usize,
    /// Underlying store error.
    #[source]
    pub source: StoreError,
}

/// Errors surfaced by [`crate::Logger`].
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The destination table could not be checked or created.
    #[error("schema bootstrap failed for table {table}: {source}")]
    Schema {
        /// Destination table.
        table: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// A flush failed.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The logger no longer accepts writes.
    #[error("logger has been terminated")]
    Terminated,

    /// Construction happened outside a tokio runtime.
    #[error("no tokio runtime available for the flush scheduler")]
    NoRuntime,

    /// A background flush task panicked or was cancelled.
    #[error("flush task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Invalid configuration.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Opening the backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for logger operations.
pub type Result<T> = std::result::Result<T, LoggerError>;
