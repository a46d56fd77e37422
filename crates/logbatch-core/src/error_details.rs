//! Error capture for error-level entries.
//!
//! Rust errors expose a message and a `source()` chain but neither their
//! runtime type nor a stack once erased to `dyn Error`. [`ErrorDetails::capture`]
//! therefore records:
//!
//! - `message`: the outermost error's `Display` output
//! - `type_name`: the root cause's type when it is the caller's own error or a
//!   well-known std type, otherwise the caller's error type
//! - `stack`: a [`Backtrace`] captured at the logging call, present only when
//!   backtraces are enabled (`RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`)

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;

/// Message, type name, and stack of an error attached to a log entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorDetails {
    message: String,
    type_name: String,
    stack: Option<String>,
}

impl ErrorDetails {
    /// Build details from explicit parts.
    pub fn new(
        message: impl Into<String>,
        type_name: impl Into<String>,
        stack: Option<impl Into<String>>,
    ) -> Self {
        Self {
            message: message.into(),
            type_name: type_name.into(),
            stack: stack.map(Into::into),
        }
    }

    /// Capture details from a live error value.
    ///
    /// The type name is the root cause's only when it is a known std, serde
    /// or chrono error; any other chain falls back to `E`.
    pub fn capture<E>(error: &E) -> Self
    where
        E: Error + 'static,
    {
        let type_name = match error.source() {
            None => std::any::type_name::<E>(),
            Some(_) => known_type_name(root_cause(error)).unwrap_or(std::any::type_name::<E>()),
        };

        let backtrace = Backtrace::capture();
        let stack = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        Self {
            message: error.to_string(),
            type_name: type_name.to_string(),
            stack,
        }
    }

    /// The error's own message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Type name recorded in the `type` column.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Stack trace recorded in the `stack` column.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// `"<caller message> - <error message>"`.
    pub fn compose_message(&self, caller_message: &str) -> String {
        format!("{caller_message} - {}", self.message)
    }
}

/// Deepest error in the `source()` chain.
pub fn root_cause<'a>(error: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    let mut current = error;
    while let Some(next) = current.source() {
        current = next;
    }
    current
}

/// Name std error types that commonly end a source chain.
fn known_type_name(error: &(dyn Error + 'static)) -> Option<&'static str> {
    macro_rules! match_types {
        ($($ty:ty),* $(,)?) => {
            $(
                if error.is::<$ty>() {
                    return Some(std::any::type_name::<$ty>());
                }
            )*
        };
    }

    match_types!(
        std::io::Error,
        std::fmt::Error,
        std::num::ParseIntError,
        std::num::ParseFloatError,
        std::num::TryFromIntError,
        std::str::Utf8Error,
        std::string::FromUtf8Error,
        std::str::ParseBoolError,
        std::time::SystemTimeError,
        serde_json::Error,
        chrono::ParseError,
    );
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
