//! Logger settings and their compiled defaults.

use std::path::PathBuf;
use std::time::Duration;

use logbatch_core::TableName;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// What happens to a drained batch whose persist failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Drop the batch. The error still reaches the flush initiator.
    #[default]
    Discard,
    /// Push the batch back to the front of the cache for the next flush.
    Requeue,
}

impl FailurePolicy {
    /// Parse `discard` / `requeue` (case-insensitive).
    pub fn parse(val: &str) -> Option<Self> {
        match val.to_lowercase().as_str() {
            "discard" => Some(Self::Discard),
            "requeue" => Some(Self::Requeue),
            _ => None,
        }
    }
}

/// Buffered logger configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggerSettings {
    /// Path to the `SQLite` database file.
    pub database: PathBuf,
    /// Destination table.
    pub table: String,
    /// Cache size that triggers an immediate flush.
    pub max_entries: usize,
    /// How often the scheduler checks whether to flush, in milliseconds.
    pub tick_interval_ms: u64,
    /// Minimum time between scheduled flushes, in milliseconds.
    pub min_flush_interval_ms: u64,
    /// Fate of a batch whose persist failed.
    pub failure_policy: FailurePolicy,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            database: home_dir().join("logs.db"),
            table: "Logs".to_string(),
            max_entries: 16,
            tick_interval_ms: 30_000,
            min_flush_interval_ms: 60_000,
            failure_policy: FailurePolicy::Discard,
            pool_size: 4,
            busy_timeout_ms: 30_000,
        }
    }
}

impl LoggerSettings {
    /// Destination table as a validated identifier.
    pub fn table_name(&self) -> Result<TableName> {
        TableName::new(self.table.as_str())
            .map_err(|e| SettingsError::InvalidValue(format!("table: {e}")))
    }

    /// Scheduler tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Debounce window between scheduled flushes.
    pub fn min_flush_interval(&self) -> Duration {
        Duration::from_millis(self.min_flush_interval_ms)
    }

    /// Reject settings the logger cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(SettingsError::InvalidValue(
                "maxEntries must be at least 1".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "tickIntervalMs must be at least 1".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(SettingsError::InvalidValue(
                "poolSize must be at least 1".to_string(),
            ));
        }
        let _ = self.table_name()?;
        Ok(())
    }
}

/// `~/.logbatch`, falling back to `/tmp/.logbatch` without `HOME`.
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".logbatch")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
