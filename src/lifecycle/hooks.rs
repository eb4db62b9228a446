//! User hooks and the cleanup completion signal.
//!
//! Cleanup can be written in two styles: a callback that receives a [`Done`]
//! handle, or an async function whose output is the result. Both are adapted
//! onto the same single-use `Done` so the orchestrator only ever waits on one
//! completion source.

use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::lifecycle::signals::Signal;

/// Boxed error type accepted from cleanup routines.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type SignalHook = Arc<dyn Fn(Signal) + Send + Sync>;
pub type TimeoutHook = Arc<dyn Fn() + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&CloseError) + Send + Sync>;

/// Why a cleanup routine did not complete successfully.
#[derive(Debug, Error)]
pub enum CloseError {
    /// The routine reported an error.
    #[error("cleanup failed: {0}")]
    Failed(#[source] BoxError),

    /// The routine panicked.
    #[error("cleanup panicked: {0}")]
    Panicked(String),

    /// The completion handle was dropped without being signalled.
    #[error("cleanup dropped its completion handle")]
    Abandoned,
}

/// Single-use completion signal handed to callback-style cleanup.
///
/// Consuming `self` makes a second completion impossible. Dropping it
/// without calling any method completes the cleanup with
/// [`CloseError::Abandoned`].
#[derive(Debug)]
pub struct Done {
    tx: oneshot::Sender<Result<(), CloseError>>,
}

impl Done {
    fn channel() -> (Self, oneshot::Receiver<Result<(), CloseError>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Signal successful completion.
    pub fn ok(self) {
        self.notify_done(Ok(()));
    }

    /// Signal completion with an error.
    pub fn fail(self, err: impl Into<BoxError>) {
        self.notify_done(Err(CloseError::Failed(err.into())));
    }

    /// Signal completion with the given result.
    pub fn finish(self, result: Result<(), BoxError>) {
        self.notify_done(result.map_err(CloseError::Failed));
    }

    fn notify_done(self, result: Result<(), CloseError>) {
        // The receiver is gone once the watchdog has fired; late results are discarded.
        if self.tx.send(result).is_err() {
            tracing::debug!("cleanup completed after shutdown was decided, ignoring");
        }
    }
}

/// A cleanup routine in either completion style.
#[derive(Clone)]
pub enum CloseHandler {
    Callback(Arc<dyn Fn(Done) + Send + Sync>),
    Async(Arc<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>),
}

impl CloseHandler {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::Async(Arc::new(move || f().boxed()))
    }

    /// Start the routine and return a future resolving when it reports completion.
    ///
    /// Async routines run on their own task: they are never aborted, only
    /// ignored once the outcome has been decided.
    pub fn start(&self) -> BoxFuture<'static, Result<(), CloseError>> {
        let (done, rx) = Done::channel();
        let started = match self {
            Self::Callback(f) => catch_unwind(AssertUnwindSafe(|| f(done))),
            // The closure body before its first await runs here, not on the task.
            Self::Async(f) => catch_unwind(AssertUnwindSafe(|| f())).map(|fut| {
                tokio::spawn(async move {
                    let result = match AssertUnwindSafe(fut).catch_unwind().await {
                        Ok(result) => result.map_err(CloseError::Failed),
                        Err(panic) => Err(CloseError::Panicked(panic_message(&*panic))),
                    };
                    done.notify_done(result);
                });
            }),
        };
        if let Err(panic) = started {
            let message = panic_message(&*panic);
            tracing::error!(panic = %message, "cleanup routine panicked");
            return future::ready(Err(CloseError::Panicked(message))).boxed();
        }
        async move { rx.await.unwrap_or(Err(CloseError::Abandoned)) }.boxed()
    }
}

impl std::fmt::Debug for CloseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("CloseHandler::Callback"),
            Self::Async(_) => f.write_str("CloseHandler::Async"),
        }
    }
}

/// Run a notification hook, logging instead of unwinding if it panics.
///
/// The panic hook has already reported the panic; the caller goes on to exit.
pub(crate) fn notify(hook: &'static str, f: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(hook, panic = %panic_message(&*panic), "notification hook panicked");
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
