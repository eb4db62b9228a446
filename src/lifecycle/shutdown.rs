//! Shutdown orchestration.
//!
//! ```text
//! Idle ──trigger──▶ Closing ──cleanup ok──────▶ Completed  (exit 0)
//!                          ──cleanup error───▶ Errored    (exit 1)
//!                          ──watchdog fired──▶ TimedOut   (exit 2)
//! ```
//!
//! The `Idle → Closing` transition is a single compare-and-set taken before
//! the first await, so of any number of concurrent triggers exactly one runs.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{ShutdownOptions, DEFAULT_TIMEOUT_MS};
use crate::config::validation::{check_timeout_ms, ConfigError};
use crate::lifecycle::exit::{Exit, ProcessExit, EXIT_CLEAN, EXIT_ERROR, EXIT_TIMEOUT};
use crate::lifecycle::hooks::{
    notify, BoxError, CloseError, CloseHandler, Done, ErrorHook, SignalHook, TimeoutHook,
};
use crate::lifecycle::signals::Signal;

/// Validated shutdown configuration. Built once at setup.
#[derive(Clone)]
pub struct ShutdownConfig {
    on_signal: Option<SignalHook>,
    on_close: Option<CloseHandler>,
    on_timeout: Option<TimeoutHook>,
    on_error: Option<ErrorHook>,
    timeout: Duration,
    strict: bool,
}

impl ShutdownConfig {
    pub fn builder() -> ShutdownConfigBuilder {
        ShutdownConfigBuilder::default()
    }

    /// Cleanup deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the host's own close event is left alone.
    pub fn strict(&self) -> bool {
        self.strict
    }
}

impl fmt::Debug for ShutdownConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownConfig")
            .field("on_signal", &self.on_signal.is_some())
            .field("on_close", &self.on_close)
            .field("on_timeout", &self.on_timeout.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("timeout", &self.timeout)
            .field("strict", &self.strict)
            .finish()
    }
}

/// Builder for [`ShutdownConfig`]. Validation happens in [`build`](Self::build).
#[derive(Default)]
pub struct ShutdownConfigBuilder {
    on_signal: Option<SignalHook>,
    on_close: Option<CloseHandler>,
    on_timeout: Option<TimeoutHook>,
    on_error: Option<ErrorHook>,
    timeout_ms: Option<f64>,
    strict: bool,
}

impl ShutdownConfigBuilder {
    /// Called with the signal that started shutdown, before cleanup.
    pub fn on_signal(mut self, f: impl Fn(Signal) + Send + Sync + 'static) -> Self {
        self.on_signal = Some(Arc::new(f));
        self
    }

    /// Callback-style cleanup. `f` must eventually complete the [`Done`] it is given.
    pub fn on_close(mut self, f: impl Fn(Done) + Send + Sync + 'static) -> Self {
        self.on_close = Some(CloseHandler::callback(f));
        self
    }

    /// Async cleanup. Completion is the future's output.
    pub fn on_close_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.on_close = Some(CloseHandler::from_async(f));
        self
    }

    pub fn on_timeout(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_timeout = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&CloseError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_secs_f64() * 1000.0);
        self
    }

    pub fn timeout_ms(mut self, ms: f64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Apply options loaded from a config file.
    pub fn options(self, options: &ShutdownOptions) -> Self {
        self.timeout_ms(options.timeout_ms).strict(options.strict)
    }

    pub fn build(self) -> Result<ShutdownConfig, ConfigError> {
        let timeout = check_timeout_ms(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))?;
        Ok(ShutdownConfig {
            on_signal: self.on_signal,
            on_close: self.on_close,
            on_timeout: self.on_timeout,
            on_error: self.on_error,
            timeout,
            strict: self.strict,
        })
    }
}

/// What started a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Signal(Signal),
    HostClose,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Signal(signal) => write!(f, "signal {signal}"),
            Trigger::HostClose => f.write_str("host close"),
            Trigger::Manual => f.write_str("manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Idle = 0,
    Closing = 1,
    Completed = 2,
    TimedOut = 3,
    Errored = 4,
}

impl State {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => State::Idle,
            1 => State::Closing,
            2 => State::Completed,
            3 => State::TimedOut,
            _ => State::Errored,
        }
    }
}

/// Terminal result of a shutdown sequence.
#[derive(Debug)]
pub enum Outcome {
    Completed,
    Errored(CloseError),
    TimedOut,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Completed => EXIT_CLEAN,
            Outcome::Errored(_) => EXIT_ERROR,
            Outcome::TimedOut => EXIT_TIMEOUT,
        }
    }

    fn state(&self) -> State {
        match self {
            Outcome::Completed => State::Completed,
            Outcome::Errored(_) => State::Errored,
            Outcome::TimedOut => State::TimedOut,
        }
    }
}

/// Runs the cleanup routine under a watchdog and ends the process.
pub struct Orchestrator {
    config: ShutdownConfig,
    state: AtomicU8,
    exit: Arc<dyn Exit>,
}

impl Orchestrator {
    pub fn new(config: ShutdownConfig, exit: Arc<dyn Exit>) -> Self {
        Self {
            config,
            state: AtomicU8::new(State::Idle as u8),
            exit,
        }
    }

    /// An orchestrator that terminates the current process.
    pub fn with_process_exit(config: ShutdownConfig) -> Self {
        Self::new(config, Arc::new(ProcessExit))
    }

    pub fn config(&self) -> &ShutdownConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_closing(&self) -> bool {
        self.state() != State::Idle
    }

    /// Run `on_signal` for a received signal. Best effort; called for every
    /// signal, whether or not it ends up starting the shutdown.
    pub fn notify_signal(&self, signal: Signal) {
        if let Some(hook) = &self.config.on_signal {
            notify("on_signal", || hook(signal));
        }
    }

    /// Start shutdown explicitly.
    pub async fn close(&self) -> Option<Outcome> {
        self.trigger(Trigger::Manual).await
    }

    /// Run the shutdown sequence if none has started yet.
    ///
    /// Returns `None` when another trigger got there first. Otherwise the
    /// exit seam is called; `Some` is only observed when it returns.
    pub async fn trigger(&self, trigger: Trigger) -> Option<Outcome> {
        if self
            .state
            .compare_exchange(
                State::Idle as u8,
                State::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::debug!(trigger = %trigger, state = ?self.state(), "Shutdown already in progress, ignoring trigger");
            return None;
        }

        tracing::info!(
            trigger = %trigger,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Shutdown started"
        );

        let outcome = match &self.config.on_close {
            None => Outcome::Completed,
            Some(handler) => {
                let watchdog = tokio::time::sleep(self.config.timeout);
                let cleanup = handler.start();
                tokio::select! {
                    biased;
                    result = cleanup => match result {
                        Ok(()) => Outcome::Completed,
                        Err(err) => Outcome::Errored(err),
                    },
                    () = watchdog => Outcome::TimedOut,
                }
            }
        };

        Some(self.finish(outcome))
    }

    fn finish(&self, outcome: Outcome) -> Outcome {
        self.state.store(outcome.state() as u8, Ordering::Release);

        match &outcome {
            Outcome::Completed => tracing::info!("Cleanup completed"),
            Outcome::Errored(err) => {
                tracing::error!(error = %err, "Cleanup failed");
                if let Some(hook) = &self.config.on_error {
                    notify("on_error", || hook(err));
                }
            }
            Outcome::TimedOut => {
                tracing::warn!(
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Cleanup timed out"
                );
                if let Some(hook) = &self.config.on_timeout {
                    notify("on_timeout", || hook());
                }
            }
        }

        self.exit.exit(outcome.exit_code());
        outcome
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}
