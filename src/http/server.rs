//! HTTP host application.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (tracing, timeout)
//! - Serve on a listener until closed
//! - Expose the close lifecycle: pre-close hooks, graceful stop, close hooks

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ListenerConfig;
use crate::lifecycle::shim::{CloseHooks, HostHook};

/// HTTP server hosting the application.
pub struct HttpServer {
    router: Router,
    handle: HostHandle,
}

impl HttpServer {
    /// Create a new HTTP server with the given listener configuration.
    pub fn new(config: &ListenerConfig) -> Self {
        let handle = HostHandle::new();
        let router = Self::build_router(config, handle.clone());
        Self { router, handle }
    }

    fn build_router(config: &ListenerConfig, handle: HostHandle) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .with_state(handle)
            .layer(request_timeout(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Handle for closing the server and registering close hooks.
    pub fn handle(&self) -> HostHandle {
        self.handle.clone()
    }

    /// Run the server until [`HostHandle::close`] stops it.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let inner = &self.handle.inner;
        let mut stop = inner.stop.subscribe();
        inner.running.send_replace(true);

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.wait_for(|stop| *stop).await;
            })
            .await;

        inner.running.send_replace(false);
        tracing::info!("HTTP server stopped");
        result
    }
}

struct HostInner {
    closing: AtomicBool,
    stop: watch::Sender<bool>,
    running: watch::Sender<bool>,
    pre_close: Mutex<Vec<HostHook>>,
    on_close: Mutex<Vec<HostHook>>,
}

/// Cloneable handle to the host's close lifecycle.
#[derive(Clone)]
pub struct HostHandle {
    inner: Arc<HostInner>,
}

impl HostHandle {
    fn new() -> Self {
        Self {
            inner: Arc::new(HostInner {
                closing: AtomicBool::new(false),
                stop: watch::Sender::new(false),
                running: watch::Sender::new(false),
                pre_close: Mutex::new(Vec::new()),
                on_close: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_closing(&self) -> bool {
        self.inner.closing.load(Ordering::Acquire)
    }

    /// Close the host: run pre-close hooks, stop serving, run close hooks.
    ///
    /// Only the first call does anything; later calls return immediately.
    pub async fn close(&self) {
        if self.inner.closing.swap(true, Ordering::AcqRel) {
            tracing::debug!("Host already closing");
            return;
        }
        tracing::info!("Host closing");

        for hook in snapshot(&self.inner.pre_close) {
            hook().await;
        }

        self.inner.stop.send_replace(true);
        let mut running = self.inner.running.subscribe();
        let _ = running.wait_for(|running| !*running).await;

        for hook in snapshot(&self.inner.on_close) {
            hook().await;
        }
        tracing::info!("Host closed");
    }
}

impl CloseHooks for HostHandle {
    fn add_pre_close_hook(&self, hook: HostHook) {
        lock(&self.inner.pre_close).push(hook);
    }

    fn add_close_hook(&self, hook: HostHook) {
        lock(&self.inner.on_close).push(hook);
    }
}

fn lock(hooks: &Mutex<Vec<HostHook>>) -> std::sync::MutexGuard<'_, Vec<HostHook>> {
    hooks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Hooks may register further hooks; never hold the lock across an await.
fn snapshot(hooks: &Mutex<Vec<HostHook>>) -> Vec<HostHook> {
    lock(hooks).clone()
}

/// Requests running longer than `timeout` are answered with 408.
fn request_timeout(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

async fn root_handler() -> &'static str {
    "ok"
}

async fn health_handler(State(handle): State<HostHandle>) -> impl IntoResponse {
    let status = if handle.is_closing() { "closing" } else { "ok" };
    Json(json!({ "status": status }))
}
