//! Graceful shutdown coordinator for a long-running server process.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{install, install_with_exit, Orchestrator, ShutdownConfig};
