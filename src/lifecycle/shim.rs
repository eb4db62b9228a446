//! Host integration.
//!
//! The host application exposes two hook points around its own close
//! sequence. In non-strict mode the orchestrator is attached to the
//! post-close hook so that closing the host through its own API runs the
//! same timeout-guarded cleanup as a signal does.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use crate::lifecycle::shutdown::{Orchestrator, Trigger};

/// A hook run by the host while it closes.
pub type HostHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Close-lifecycle hook registration exposed by a host application.
pub trait CloseHooks {
    /// Run `hook` when the host begins closing, before it stops serving.
    fn add_pre_close_hook(&self, hook: HostHook);

    /// Run `hook` after the host has stopped serving.
    fn add_close_hook(&self, hook: HostHook);
}

/// Route the host's close event into `orchestrator` unless it is strict.
///
/// Returns whether a hook was attached.
pub fn attach<H>(host: &H, orchestrator: &Arc<Orchestrator>) -> bool
where
    H: CloseHooks + ?Sized,
{
    if orchestrator.config().strict() {
        tracing::debug!("Strict mode, host close event not intercepted");
        return false;
    }

    let orchestrator = Arc::clone(orchestrator);
    host.add_close_hook(Arc::new(move || {
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            orchestrator.trigger(Trigger::HostClose).await;
        }
        .boxed()
    }));
    tracing::debug!("Attached to host close event");
    true
}
