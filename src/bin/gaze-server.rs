//! Publishes synthetic gaze samples to every client that connects.
//!
//! Runs until Enter is pressed or Ctrl-C is received.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gazestream::transport::DEFAULT_BIND_HOST;
use gazestream::{Endpoint, Server, ServerConfig, SyntheticSource};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gaze-server")]
#[command(version)]
#[command(about = "Stream gaze telemetry to connected clients")]
struct Cli {
    /// TCP port, or a Unix socket path
    target: Option<String>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Records per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Milliseconds between batches
    #[arg(long = "tick-ms")]
    tick_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(cli)?;
    let source = Arc::new(SyntheticSource::new(config.subsecond_unit));
    let server = Server::bind(&config, source)
        .await
        .with_context(|| format!("Failed to start server on {}", config.endpoint))?;

    info!("Press Enter to stop");
    let handle = server.spawn(CancellationToken::new());

    wait_for_operator().await;

    let report = handle.shutdown().await.context("Server task failed")?;
    info!(
        connections_accepted = report.connections_accepted,
        disconnected = report.disconnected,
        failed = report.failed,
        "Shut down"
    );
    Ok(())
}

fn build_config(cli: Cli) -> Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_yaml_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(target) = &cli.target {
        config.endpoint = Endpoint::from_target(DEFAULT_BIND_HOST, target);
    }
    if let Some(batch_size) = cli.batch_size {
        config.publisher.batch_size = batch_size;
    }
    if let Some(ms) = cli.tick_ms {
        config.publisher.tick_period = Duration::from_millis(ms);
    }
    config.validate()?;
    Ok(config)
}

/// Resolve on an Enter keypress or Ctrl-C. A closed stdin waits for Ctrl-C.
async fn wait_for_operator() {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(());
        }
    });

    let enter = async {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = enter => info!("Stop requested"),
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }
}
