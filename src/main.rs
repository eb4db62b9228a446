//! close-guard server
//!
//! Runs the HTTP host under the shutdown coordinator. SIGINT/SIGTERM (or the
//! host closing itself) run the cleanup below under the configured timeout,
//! then the process exits with 0 (clean), 1 (cleanup error) or 2 (timeout).
//!
//! Progress of the shutdown sequence is printed to stdout; logs go to stderr.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use close_guard::config::{load_config, AppConfig};
use close_guard::lifecycle::{BoxError, ShutdownConfig};
use close_guard::observability::logging;
use close_guard::HttpServer;

#[derive(Parser)]
#[command(name = "close-guard")]
#[command(about = "HTTP server with timeout-guarded graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the shutdown timeout (milliseconds).
    #[arg(long)]
    timeout_ms: Option<f64>,

    /// Do not route the host's own close through the coordinator.
    #[arg(long)]
    strict: bool,

    /// Simulated cleanup duration (milliseconds).
    #[arg(long, default_value_t = 5)]
    cleanup_ms: u64,

    /// Make the simulated cleanup fail.
    #[arg(long)]
    fail_cleanup: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.shutdown.timeout_ms = timeout_ms;
    }
    config.shutdown.strict |= cli.strict;

    logging::init(&config.observability.log_level);
    tracing::info!("close-guard v0.1.0 starting");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    let server = HttpServer::new(&config.listener);
    let host = server.handle();

    let cleanup_host = host.clone();
    let cleanup = Duration::from_millis(cli.cleanup_ms);
    let fail_cleanup = cli.fail_cleanup;

    let shutdown = ShutdownConfig::builder()
        .options(&config.shutdown)
        .on_signal(|signal| println!("Received Signal: {signal}"))
        .on_close_async(move || {
            let host = cleanup_host.clone();
            async move {
                println!("Closing");
                host.close().await;
                tokio::time::sleep(cleanup).await;
                if fail_cleanup {
                    return Err::<(), BoxError>("simulated cleanup failure".into());
                }
                println!("Closed");
                Ok(())
            }
        })
        .on_timeout(|| println!("Timed out"))
        .on_error(|err| println!("Close error: {err}"));

    close_guard::install(&host, shutdown)?;
    println!("listening on {local_addr}");

    server.run(listener).await?;

    // The coordinator owns the process exit from here on.
    std::future::pending::<()>().await;
    Ok(())
}
