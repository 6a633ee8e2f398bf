use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use parley_channel::{ChannelDir, Mailbox, Waiter};
use parley_mcp::{serve, Dispatcher, DispatcherOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// MCP stdio server that forwards questions to a human through a parley channel
#[derive(Debug, Parser)]
#[command(name = "parley-mcp", version, about)]
struct Args {
    /// Channel directory created by `parley-host`
    #[arg(long, env = "PARLEY_CHANNEL_DIR")]
    channel: PathBuf,

    /// Seconds one tool call waits for an answer (at most one week)
    #[arg(
        long,
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS)
    )]
    timeout_secs: u64,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

mod exit_codes {
    pub const CHANNEL_ERROR: i32 = 1;
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    // stdout carries the protocol, so logs never go there.
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    info!("Starting parley-mcp v{}", env!("CARGO_PKG_VERSION"));

    let channel = match ChannelDir::open(&args.channel) {
        Ok(channel) => channel,
        Err(e) => {
            error!("Cannot use channel {}: {}", args.channel.display(), e);
            process::exit(exit_codes::CHANNEL_ERROR);
        }
    };
    info!("Using channel {}", channel.root().display());

    let options = DispatcherOptions {
        call_timeout: Duration::from_secs(args.timeout_secs),
        ..DispatcherOptions::default()
    };
    let dispatcher = Dispatcher::new(Waiter::new(Mailbox::new(channel))).with_options(options);

    serve(Arc::new(dispatcher), tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("stdio transport failed")?;

    info!("Input closed, shutting down");
    Ok(())
}
