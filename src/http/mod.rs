//! HTTP host subsystem.
//!
//! # Data Flow
//! ```text
//! HttpServer::run → axum::serve (graceful shutdown on stop)
//! HostHandle::close → pre-close hooks → stop → wait stopped → close hooks
//! ```

pub mod server;

pub use server::{HostHandle, HttpServer};
