//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse into a raw table)
//!     → validation.rs ([shutdown] kind and range checks)
//!     → serde (remaining sections)
//!     → AppConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Shutdown options are checked by hand so errors name the received kind

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, LoadError};
pub use schema::{AppConfig, ListenerConfig, ObservabilityConfig, ShutdownOptions};
pub use validation::ConfigError;
