//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;
use toml::{Table, Value};

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_shutdown_table, ConfigError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid shutdown options: {0}")]
    Config(#[from] ConfigError),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, LoadError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML source.
pub fn parse_config(content: &str) -> Result<AppConfig, LoadError> {
    let mut table: Table = toml::from_str(content)?;

    let shutdown = match table.remove("shutdown") {
        None => Default::default(),
        Some(Value::Table(section)) => validate_shutdown_table(&section)?,
        Some(other) => {
            return Err(ConfigError::Type {
                field: "shutdown",
                expected: "table",
                received: other.type_str().to_string(),
            }
            .into())
        }
    };

    let mut config: AppConfig = Value::Table(table).try_into()?;
    config.shutdown = shutdown;
    Ok(config)
}
