//! Store error types.

use thiserror::Error;

/// Errors raised by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` rejected a statement.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No pooled connection could be acquired.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// An identifier failed validation.
    #[error(transparent)]
    Core(#[from] logbatch_core::CoreError),

    /// Filesystem error while preparing the database location.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Store-specific failure without a richer source.
    #[error("{0}")]
    Other(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
