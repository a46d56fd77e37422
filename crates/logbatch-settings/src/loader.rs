//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`LoggerSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `LOGBATCH_*` environment variable overrides (highest priority)
//! 4. Validate the result

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{FailurePolicy, LoggerSettings, home_dir};

/// Resolve the path to the settings file (`~/.logbatch/settings.json`).
pub fn settings_path() -> PathBuf {
    home_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LoggerSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or a value that fails
/// [`LoggerSettings::validate`] is an error.
pub fn load_settings_from_path(path: &Path) -> Result<LoggerSettings> {
    let mut settings = read_layered(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults with the file deep-merged over them, before env overrides.
fn read_layered(path: &Path) -> Result<LoggerSettings> {
    let defaults = serde_json::to_value(LoggerSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Integers must parse and fall inside the listed range; invalid values are
/// ignored with a warning (falling back to file/default).
pub fn apply_env_overrides(settings: &mut LoggerSettings) {
    if let Some(v) = read_env_string("LOGBATCH_DB") {
        settings.database = PathBuf::from(v);
    }
    if let Some(v) = read_env_string("LOGBATCH_TABLE") {
        settings.table = v;
    }
    if let Some(v) = read_env_usize("LOGBATCH_MAX_ENTRIES", 1, 1_000_000) {
        settings.max_entries = v;
    }
    if let Some(v) = read_env_u64("LOGBATCH_TICK_INTERVAL_MS", 1, 86_400_000) {
        settings.tick_interval_ms = v;
    }
    if let Some(v) = read_env_u64("LOGBATCH_MIN_FLUSH_INTERVAL_MS", 0, 86_400_000) {
        settings.min_flush_interval_ms = v;
    }
    if let Some(v) = read_env_u64("LOGBATCH_POOL_SIZE", 1, 64).and_then(|v| u32::try_from(v).ok()) {
        settings.pool_size = v;
    }
    if let Some(v) =
        read_env_u64("LOGBATCH_BUSY_TIMEOUT_MS", 0, 600_000).and_then(|v| u32::try_from(v).ok())
    {
        settings.busy_timeout_ms = v;
    }
    if let Ok(val) = std::env::var("LOGBATCH_FAILURE_POLICY") {
        match FailurePolicy::parse(&val) {
            Some(policy) => settings.failure_policy = policy,
            None => {
                tracing::warn!(key = "LOGBATCH_FAILURE_POLICY", value = %val, "invalid failure policy env var, ignoring");
            }
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
