//! # TollGate Node Runtime
//!
//! Reads newline-delimited JSON requests from stdin, runs them through the
//! single block executor and writes one JSON response per line to stdout.
//! Logs go to stderr.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (defaults, `TG_CONFIG_FILE`, `TG_*`)
//! 3. Open storage, mint dev balances, write the genesis version
//! 4. Spawn the executor
//! 5. Serve stdin until EOF, Ctrl+C or a fatal halt

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use node_runtime::{build_engine, spawn, NodeConfig, Request, Response};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    info!("===========================================");
    info!("  TollGate Node Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = NodeConfig::load().context("failed to load configuration")?;
    let engine = build_engine(&config).context("failed to build engine")?;
    let (executor, task) = spawn(engine, config.channel_capacity);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        };
        let Some(line) = line else {
            info!("end of input");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match Request::parse(&line) {
            Ok(request) => match request.dispatch(&executor).await {
                Ok(response) => response,
                Err(err) => {
                    error!(error = %err, "executor halted, stopping");
                    return Err(err).context("block execution halted");
                }
            },
            Err(err) => {
                warn!(error = %err, "malformed request line");
                Response::Error(format!("malformed request: {err}"))
            }
        };

        let mut out = serde_json::to_vec(&response).context("failed to encode response")?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    drop(executor);
    task.await.context("executor task panicked")?;
    info!("shutdown complete");
    Ok(())
}
