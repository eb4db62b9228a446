//! Configuration schema definitions.
//!
//! All sections default so that an empty file is a valid configuration.
//! The `[shutdown]` section is not deserialized through serde: its keys are
//! kind-checked by `validation.rs` first so that errors can name the field
//! and the kind that was received.

use serde::{Deserialize, Serialize};

/// Default shutdown timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: f64 = 10_000.0;

/// Root configuration for a guarded server process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration for the host application.
    pub listener: ListenerConfig,

    /// Shutdown coordinator options.
    #[serde(skip)]
    pub shutdown: ShutdownOptions,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Validated, file-sourced shutdown options.
///
/// Hooks cannot come from a file; they are attached in code through
/// [`ShutdownConfigBuilder`](crate::lifecycle::ShutdownConfigBuilder).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShutdownOptions {
    /// Cleanup deadline in milliseconds (finite, > 0).
    pub timeout_ms: f64,

    /// Do not intercept the host's own close event.
    pub strict: bool,
}

impl Default for ShutdownOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            strict: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
