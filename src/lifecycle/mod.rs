//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Setup (install):
//!     Validate options → Create orchestrator → Arm signals → Attach to host
//!
//! Trigger (signals.rs, shim.rs, Orchestrator::close):
//!     SIGTERM/SIGINT or host close → Orchestrator::trigger
//!
//! Shutdown (shutdown.rs):
//!     on_signal → cleanup vs. watchdog → on_error / on_timeout → exit
//! ```
//!
//! # Design Decisions
//! - First trigger wins; the rest are dropped, not queued
//! - Shutdown has a timeout: a stalled cleanup still exits
//! - The process exit is a seam (`exit.rs`) so the sequence is testable

use std::sync::Arc;

use thiserror::Error;

use crate::config::validation::ConfigError;

pub mod exit;
pub mod hooks;
pub mod shim;
pub mod shutdown;
pub mod signals;

pub use exit::{Exit, ProcessExit, RecordingExit};
pub use hooks::{BoxError, CloseError, Done};
pub use shim::{CloseHooks, HostHook};
pub use shutdown::{
    Orchestrator, Outcome, ShutdownConfig, ShutdownConfigBuilder, State, Trigger,
};
pub use signals::Signal;

/// Errors raised while installing the shutdown coordinator.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid shutdown configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to register signal handlers: {0}")]
    Signals(#[from] std::io::Error),
}

/// Install the shutdown coordinator on `host`.
///
/// Validates `builder`, arms the signal listener and, unless strict, attaches
/// to the host's close event. Must be called from within a Tokio runtime.
pub fn install<H>(host: &H, builder: ShutdownConfigBuilder) -> Result<Arc<Orchestrator>, SetupError>
where
    H: CloseHooks + ?Sized,
{
    install_with_exit(host, builder, Arc::new(ProcessExit))
}

/// [`install`] with a custom exit seam.
pub fn install_with_exit<H>(
    host: &H,
    builder: ShutdownConfigBuilder,
    exit: Arc<dyn Exit>,
) -> Result<Arc<Orchestrator>, SetupError>
where
    H: CloseHooks + ?Sized,
{
    let config = builder.build()?;
    tracing::info!(
        timeout_ms = config.timeout().as_millis() as u64,
        strict = config.strict(),
        "Installing shutdown coordinator"
    );

    let orchestrator = Arc::new(Orchestrator::new(config, exit));
    signals::listen(Arc::clone(&orchestrator))?;
    shim::attach(host, &orchestrator);
    Ok(orchestrator)
}
