//! Observability subsystem.
//!
//! All subsystems emit `tracing` events with structured fields;
//! `logging.rs` installs the subscriber that renders them.

pub mod logging;
