//! # logbatch-core
//!
//! Foundation types shared by every logbatch crate:
//!
//! - [`LogLevel`] and [`LogEntry`], the immutable record that flows from the
//!   logger facade through the cache into the backing store
//! - [`ErrorDetails`], the message/type/stack triple captured from a Rust
//!   error for error-level entries
//! - [`TableName`], a destination identifier restricted to a fixed grammar so
//!   it can be spliced into DDL and DML safely
//! - [`CoreError`] for the few fallible operations above

#![deny(unsafe_code)]

pub mod error_details;
pub mod errors;
pub mod ident;
pub mod types;

pub use error_details::ErrorDetails;
pub use errors::{CoreError, Result};
pub use ident::TableName;
pub use types::{LogEntry, LogLevel};
