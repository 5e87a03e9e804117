//! Receives gaze samples from a server, printing and recording them.
//!
//! Runs until Enter is pressed, Ctrl-C is received or the server closes the
//! stream.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gazestream::client::recording_sink;
use gazestream::transport::DEFAULT_HOST;
use gazestream::{Client, ClientConfig, Endpoint};
use tokio::sync::oneshot;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gaze-client")]
#[command(version)]
#[command(about = "Receive and record gaze telemetry")]
struct Cli {
    /// Server host; given alone, a TCP port or Unix socket path on localhost
    host: Option<String>,

    /// TCP port, or a Unix socket path
    target: Option<String>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the CSV recording
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Do not print records
    #[arg(long, short)]
    quiet: bool,
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
    let sink = recording_sink(&config)
        .with_context(|| format!("Failed to open output in {}", config.output_dir.display()))?;
    let client = Client::connect(&config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.endpoint))?;

    info!("Press Enter to stop");
    let handle = client.spawn(sink);

    tokio::select! {
        _ = wait_for_operator() => {}
        _ = handle.closed() => info!("Stream ended"),
    }

    let report = handle.stop().await.context("Ingestion task failed")?;
    let summary = report.result?;
    info!(
        batches = summary.batches_received,
        records = summary.records_received,
        "Disconnected from {}",
        summary.peer
    );
    Ok(())
}

fn build_config(cli: Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_yaml_file(path)?,
        None => ClientConfig::default(),
    };
    match (&cli.host, &cli.target) {
        (Some(host), Some(target)) => config.endpoint = Endpoint::from_target(host, target),
        (Some(target), None) => config.endpoint = Endpoint::from_target(DEFAULT_HOST, target),
        (None, _) => {}
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if cli.quiet {
        config.console = false;
    }
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
