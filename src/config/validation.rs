//! Shutdown option validation.
//!
//! # Responsibilities
//! - Reject hook keys in untyped sources (hooks are only attachable in code)
//! - Check the kind of `timeout` and `strict`
//! - Check the range of `timeout` (finite, > 0)
//!
//! # Design Decisions
//! - Fails on the first offending field, in declaration order
//! - Pure function: `&toml::Table → Result<ShutdownOptions, ConfigError>`
//! - Runs at setup, never at shutdown time

use std::time::Duration;

use thiserror::Error;
use toml::{Table, Value};

use crate::config::schema::ShutdownOptions;

/// Hook fields, in the order they are checked.
pub const HOOK_FIELDS: [&str; 4] = ["on_signal", "on_close", "on_timeout", "on_error"];

/// Errors raised while validating shutdown options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds a value of the wrong kind.
    #[error("{field} must be a {expected}, received {received}")]
    Type {
        field: &'static str,
        expected: &'static str,
        received: String,
    },

    /// A field holds a value of the right kind outside its allowed range.
    #[error("{field} must be {bound}, received {value}")]
    Range {
        field: &'static str,
        bound: &'static str,
        value: String,
    },

    /// A key that is not a shutdown option.
    #[error("unknown shutdown option `{0}`")]
    UnknownField(String),
}

/// Validate a raw `[shutdown]` table and normalize it into options.
pub fn validate_shutdown_table(table: &Table) -> Result<ShutdownOptions, ConfigError> {
    for field in HOOK_FIELDS {
        if let Some(value) = table.get(field) {
            return Err(ConfigError::Type {
                field,
                expected: "function",
                received: value.type_str().to_string(),
            });
        }
    }

    let mut options = ShutdownOptions::default();

    if let Some(value) = table.get("timeout") {
        let ms = match value {
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            other => {
                return Err(ConfigError::Type {
                    field: "timeout",
                    expected: "number",
                    received: other.type_str().to_string(),
                })
            }
        };
        check_timeout_ms(ms)?;
        options.timeout_ms = ms;
    }

    if let Some(value) = table.get("strict") {
        options.strict = value.as_bool().ok_or_else(|| ConfigError::Type {
            field: "strict",
            expected: "boolean",
            received: value.type_str().to_string(),
        })?;
    }

    if let Some(key) = table
        .keys()
        .find(|key| !matches!(key.as_str(), "timeout" | "strict"))
    {
        return Err(ConfigError::UnknownField(key.clone()));
    }

    Ok(options)
}

/// Check a timeout given in milliseconds and convert it to a `Duration`.
pub fn check_timeout_ms(ms: f64) -> Result<Duration, ConfigError> {
    if !ms.is_finite() {
        return Err(ConfigError::Type {
            field: "timeout",
            expected: "number",
            received: "non-finite float".to_string(),
        });
    }
    if ms <= 0.0 {
        return Err(ConfigError::Range {
            field: "timeout",
            bound: "greater than 0",
            value: ms.to_string(),
        });
    }
    Duration::try_from_secs_f64(ms / 1000.0).map_err(|_| ConfigError::Range {
        field: "timeout",
        bound: "representable as a duration",
        value: ms.to_string(),
    })
}
