//! Validated destination identifiers.
//!
//! Table names end up inside DDL and DML text, where they cannot be bound as
//! parameters. [`TableName`] only admits `[A-Za-z_][A-Za-z0-9_]{0,63}` and is
//! always emitted double-quoted, so no caller-supplied text reaches SQL
//! unchecked.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};

/// Maximum identifier length.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// A table name that matches the identifier grammar.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Validate and wrap `name`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// The bare identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier quoted for SQL (`"name"`).
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

fn validate(name: &str) -> Result<()> {
    let reject = |reason| {
        Err(CoreError::InvalidIdentifier {
            name: name.to_string(),
            reason,
        })
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return reject("empty");
    };
    if name.len() > MAX_IDENTIFIER_LEN {
        return reject("longer than 64 characters");
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return reject("must start with a letter or underscore");
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return reject("contains a character outside [A-Za-z0-9_]");
    }
    Ok(())
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TableName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for TableName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
