//! Core error types.

use thiserror::Error;

/// Errors raised while building core values.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A destination identifier did not match the allowed grammar.
    #[error("invalid identifier {name:?}: {reason}")]
    InvalidIdentifier {
        /// The rejected identifier as supplied.
        name: String,
        /// Which rule it broke.
        reason: &'static str,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
