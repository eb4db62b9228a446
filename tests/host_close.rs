//! Host close integration: closing the host through its own API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use close_guard::config::ListenerConfig;
use close_guard::http::{HostHandle, HttpServer};
use close_guard::lifecycle::{
    install_with_exit, BoxError, CloseHooks, Orchestrator, RecordingExit, ShutdownConfig,
    ShutdownConfigBuilder, State,
};
use futures_util::FutureExt;
use tokio::net::TcpListener;

async fn start_host() -> (HostHandle, String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&ListenerConfig::default());
    let host = server.handle();
    let task = tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });
    (host, format!("http://{addr}"), task)
}

fn install(
    host: &HostHandle,
    builder: ShutdownConfigBuilder,
) -> (Arc<Orchestrator>, Arc<RecordingExit>) {
    let exit = Arc::new(RecordingExit::default());
    let orch = install_with_exit(host, builder, exit.clone()).unwrap();
    (orch, exit)
}

fn counting_cleanup(runs: &Arc<AtomicUsize>, delay: Duration) -> ShutdownConfigBuilder {
    let runs = runs.clone();
    ShutdownConfig::builder().on_close_async(move || {
        runs.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(delay).await;
            Ok::<(), BoxError>(())
        }
    })
}

#[tokio::test]
async fn test_host_close_runs_guarded_cleanup() {
    let (host, url, server_task) = start_host().await;
    let runs = Arc::new(AtomicUsize::new(0));
    let (orch, exit) = install(
        &host,
        counting_cleanup(&runs, Duration::from_millis(5)).timeout_ms(500.0),
    );

    let health: serde_json::Value = reqwest::get(format!("{url}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    host.close().await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(orch.state(), State::Completed);
    assert_eq!(exit.codes(), vec![0]);
    server_task.await.unwrap();
    assert!(reqwest::get(&url).await.is_err());
}

#[tokio::test]
async fn test_host_close_times_out() {
    let (host, _url, _server_task) = start_host().await;
    let runs = Arc::new(AtomicUsize::new(0));
    let timeouts = Arc::new(AtomicUsize::new(0));
    let t = timeouts.clone();
    let (orch, exit) = install(
        &host,
        counting_cleanup(&runs, Duration::from_millis(300))
            .timeout_ms(30.0)
            .on_timeout(move || {
                t.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(|err| panic!("unexpected cleanup error: {err}")),
    );

    host.close().await;

    assert_eq!(orch.state(), State::TimedOut);
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    assert_eq!(exit.codes(), vec![2]);
}

#[tokio::test]
async fn test_strict_host_close_is_independent() {
    let (host, _url, server_task) = start_host().await;
    let runs = Arc::new(AtomicUsize::new(0));
    let (orch, exit) = install(
        &host,
        counting_cleanup(&runs, Duration::from_millis(1)).strict(true),
    );

    host.close().await;
    server_task.await.unwrap();

    assert_eq!(orch.state(), State::Idle);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(exit.codes().is_empty());

    orch.close().await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(exit.codes(), vec![0]);
}

#[tokio::test]
async fn test_cleanup_closing_host_does_not_reenter() {
    let (host, url, server_task) = start_host().await;
    let runs = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let s = seen.clone();
    let health_url = format!("{url}/health");
    host.add_pre_close_hook(Arc::new(move || {
        let s = s.clone();
        let health_url = health_url.clone();
        async move {
            let body: serde_json::Value =
                reqwest::get(&health_url).await.unwrap().json().await.unwrap();
            s.lock().unwrap().push(body["status"].as_str().unwrap().to_string());
        }
        .boxed()
    }));

    let cleanup_host = host.clone();
    let r = runs.clone();
    let (orch, exit) = install(
        &host,
        ShutdownConfig::builder()
            .timeout_ms(1000.0)
            .on_close_async(move || {
                r.fetch_add(1, Ordering::SeqCst);
                let host = cleanup_host.clone();
                async move {
                    host.close().await;
                    Ok::<(), BoxError>(())
                }
            }),
    );

    orch.close().await;
    server_task.await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["closing"]);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(exit.codes(), vec![0]);
}
