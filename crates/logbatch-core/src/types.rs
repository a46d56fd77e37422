//! Log entry types shared across the workspace.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error_details::ErrorDetails;

/// Severity of a log entry.
///
/// The persisted spelling is the variant name (`"Info"`, `"Warning"`,
/// `"Error"`, `"FatalError"`), which always fits the 16-character `level`
/// column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Normal operational messages.
    Info,
    /// Recoverable problems worth looking at.
    Warning,
    /// Failed operations.
    Error,
    /// Failures the process cannot continue from.
    FatalError,
}

impl LogLevel {
    /// All levels in ascending severity.
    pub const ALL: [Self; 4] = [Self::Info, Self::Warning, Self::Error, Self::FatalError];

    /// Persisted column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::FatalError => "FatalError",
        }
    }

    /// Convert from string (case-insensitive). Unknown values map to `Info`.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "warn" | "warning" => Self::Warning,
            "error" => Self::Error,
            "fatal" | "fatalerror" | "fatal_error" => Self::FatalError,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log record awaiting persistence.
///
/// Fields are private: an entry is assembled with the consuming `with_*`
/// methods and is read-only from then on. Optional text fields that were
/// never set stay `None` and persist as SQL `NULL`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl LogEntry {
    /// Start an entry at `level`, timestamped with the current UTC time.
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: None,
            process: None,
            context: None,
            error_type: None,
            stack: None,
            message: None,
        }
    }

    /// Override the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the emitting component.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Set the emitting process.
    #[must_use]
    pub fn with_process(mut self, process: impl Into<String>) -> Self {
        self.process = Some(process.into());
        self
    }

    /// Set free-form context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the error type name.
    #[must_use]
    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Set the stack trace.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attach a captured error.
    ///
    /// The message becomes `"<message> - <error message>"`, and the type and
    /// stack come from the error's root cause.
    #[must_use]
    pub fn with_error(mut self, message: &str, error: &ErrorDetails) -> Self {
        self.message = Some(error.compose_message(message));
        self.error_type = Some(error.type_name().to_string());
        self.stack = error.stack().map(str::to_string);
        self
    }

    /// When the entry was created (or the caller-supplied instant).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Timestamp as persisted: RFC 3339 with millisecond precision and `Z`.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Severity.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Emitting component.
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// Emitting process.
    pub fn process(&self) -> Option<&str> {
        self.process.as_deref()
    }

    /// Free-form context.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Error type name, for error-level entries.
    pub fn error_type(&self) -> Option<&str> {
        self.error_type.as_deref()
    }

    /// Stack trace, for error-level entries.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn log_level_persisted_spelling() {
        assert_eq!(LogLevel::Info.as_str(), "Info");
        assert_eq!(LogLevel::Warning.as_str(), "Warning");
        assert_eq!(LogLevel::Error.as_str(), "Error");
        assert_eq!(LogLevel::FatalError.as_str(), "FatalError");
        for level in LogLevel::ALL {
            assert!(level.as_str().len() <= 16);
        }
    }

    #[test]
    fn log_level_display_matches_column() {
        assert_eq!(LogLevel::FatalError.to_string(), "FatalError");
    }

    #[test]
    fn log_level_from_str_lossy() {
        assert_eq!(LogLevel::from_str_lossy("WARN"), LogLevel::Warning);
        assert_eq!(LogLevel::from_str_lossy("warning"), LogLevel::Warning);
        assert_eq!(LogLevel::from_str_lossy("FatalError"), LogLevel::FatalError);
        assert_eq!(LogLevel::from_str_lossy("fatal"), LogLevel::FatalError);
        assert_eq!(LogLevel::from_str_lossy("Error"), LogLevel::Error);
        assert_eq!(LogLevel::from_str_lossy("unknown"), LogLevel::Info);
    }

    #[test]
    fn log_level_serde() {
        assert_eq!(
            serde_json::to_string(&LogLevel::Warning).unwrap(),
            "\"Warning\""
        );
        let back: LogLevel = serde_json::from_str("\"FatalError\"").unwrap();
        assert_eq!(back, LogLevel::FatalError);
    }

    #[test]
    fn new_entry_has_no_optional_fields() {
        let entry = LogEntry::new(LogLevel::Info);
        assert_eq!(entry.level(), LogLevel::Info);
        assert!(entry.component().is_none());
        assert!(entry.process().is_none());
        assert!(entry.context().is_none());
        assert!(entry.error_type().is_none());
        assert!(entry.stack().is_none());
        assert!(entry.message().is_none());
    }

    #[test]
    fn new_entry_defaults_to_now() {
        let before = Utc::now();
        let entry = LogEntry::new(LogLevel::Info);
        let after = Utc::now();
        assert!(entry.timestamp() >= before && entry.timestamp() <= after);
    }

    #[test]
    fn builders_set_fields() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let entry = LogEntry::new(LogLevel::Warning)
            .with_timestamp(ts)
            .with_component("api")
            .with_process("handler")
            .with_context("req-42")
            .with_message("slow response");
        assert_eq!(entry.timestamp(), ts);
        assert_eq!(entry.component(), Some("api"));
        assert_eq!(entry.process(), Some("handler"));
        assert_eq!(entry.context(), Some("req-42"));
        assert_eq!(entry.message(), Some("slow response"));
        assert_eq!(entry.timestamp_rfc3339(), "2025-01-15T12:00:00.000Z");
    }

    #[test]
    fn with_error_composes_message() {
        let details = ErrorDetails::new("connection refused", "std::io::Error", Some("at db.rs:10"));
        let entry = LogEntry::new(LogLevel::Error).with_error("query failed", &details);
        assert_eq!(entry.message(), Some("query failed - connection refused"));
        assert_eq!(entry.error_type(), Some("std::io::Error"));
        assert_eq!(entry.stack(), Some("at db.rs:10"));
    }

    #[test]
    fn with_error_without_stack_leaves_stack_absent() {
        let details = ErrorDetails::new("boom", "MyError", None::<String>);
        let entry = LogEntry::new(LogLevel::FatalError).with_error("crashed", &details);
        assert!(entry.stack().is_none());
    }

    #[test]
    fn entry_serde_omits_absent_fields() {
        let entry = LogEntry::new(LogLevel::Info).with_message("hello");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["message"], "hello");
        assert!(json.get("component").is_none());
        assert!(json.get("type").is_none());

        let back: LogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
