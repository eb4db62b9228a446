//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT/SIGTERM handlers (Ctrl+C elsewhere)
//! - Route every received signal to the current orchestrator
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - One listener task per process; installing a new orchestrator only
//!   retargets it, unless the runtime that owned it is gone
//! - `on_signal` sees every signal; only the first one starts shutdown

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, Weak};

use arc_swap::ArcSwapOption;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{Orchestrator, Outcome, Trigger};

/// Termination signals that start a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl Signal {
    /// Conventional signal name, e.g. `SIGINT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Held by the listener task; dead once that task (or its runtime) is dropped.
static LISTENER: Mutex<Weak<()>> = Mutex::new(Weak::new());
static TARGET: ArcSwapOption<Orchestrator> = ArcSwapOption::const_empty();

/// Route termination signals to `orchestrator`.
///
/// Returns `true` if a listener was started by this call, `false` if a live
/// listener was already running and has only been retargeted.
///
/// Must be called from within a Tokio runtime.
pub fn listen(orchestrator: Arc<Orchestrator>) -> io::Result<bool> {
    TARGET.store(Some(orchestrator));

    let mut listener = LISTENER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if listener.upgrade().is_some() {
        tracing::debug!("signal listener already running, retargeted");
        return Ok(false);
    }

    let alive = Arc::new(());
    spawn_listener(Arc::clone(&alive))?;
    *listener = Arc::downgrade(&alive);

    tracing::debug!("signal listener started");
    Ok(true)
}

#[cfg(unix)]
fn spawn_listener(alive: Arc<()>) -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        let _alive = alive;
        loop {
            let received = tokio::select! {
                Some(()) = sigint.recv() => Signal::Interrupt,
                Some(()) = sigterm.recv() => Signal::Terminate,
                else => break,
            };
            dispatch(received);
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_listener(alive: Arc<()>) -> io::Result<()> {
    tokio::spawn(async move {
        let _alive = alive;
        while tokio::signal::ctrl_c().await.is_ok() {
            dispatch(Signal::Interrupt);
        }
    });
    Ok(())
}

fn dispatch(signal: Signal) {
    tracing::info!(signal = %signal, "termination signal received");

    match TARGET.load_full() {
        Some(orchestrator) => {
            deliver(orchestrator, signal);
        }
        None => tracing::warn!(signal = %signal, "no shutdown coordinator installed"),
    }
}

/// Notify `on_signal`, then start shutdown on its own task so the receive
/// loop keeps draining signals while cleanup runs.
fn deliver(orchestrator: Arc<Orchestrator>, signal: Signal) -> JoinHandle<Option<Outcome>> {
    orchestrator.notify_signal(signal);
    tokio::spawn(async move { orchestrator.trigger(Trigger::Signal(signal)).await })
}
