use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use parley_channel::default_base_dir;
use parley_host::{terminal, Host, HostSettings, PanelMode, SessionContext, SettingsWatcher};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Text,
    Json,
}

/// Show agent questions on this terminal and send back your answers
#[derive(Debug, Parser)]
#[command(name = "parley-host", version, about)]
struct Args {
    /// Directory under which the session channel is created
    #[arg(long, env = "PARLEY_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Settings file (default: <config dir>/parley/settings.toml)
    #[arg(long, env = "PARLEY_SETTINGS")]
    settings: Option<PathBuf>,

    /// Command an MCP client should run for the server side
    #[arg(long, default_value = "parley-mcp")]
    mcp_command: String,

    /// How stdin/stdout talk to the panel
    #[arg(long, value_enum, default_value_t = Mode::Text)]
    mode: Mode,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const SESSION_ERROR: i32 = 1;
    pub const RUNTIME_ERROR: i32 = 2;
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // stdout belongs to the panel.
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting parley-host v{}", env!("CARGO_PKG_VERSION"));

    let settings_path = match args.settings.clone() {
        Some(path) => Some(path),
        None => match HostSettings::default_path() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("{}; using default settings", e);
                None
            }
        },
    };
    let settings = match settings_path.as_deref().map(HostSettings::load) {
        Some(Ok(settings)) => settings,
        Some(Err(e)) => {
            warn!("{}; using default settings", e);
            HostSettings::default()
        }
        None => HostSettings::default(),
    };

    let base = args.base_dir.clone().unwrap_or_else(default_base_dir);
    let session = match SessionContext::create(&base) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("{}", e);
            process::exit(exit_codes::SESSION_ERROR);
        }
    };

    let outcome = run(&args, session.clone(), settings, settings_path).await;
    session.close();

    // Exit directly: a stdin read still parked on a blocking thread would
    // otherwise keep the runtime alive.
    match outcome {
        Ok(()) => {
            info!("Session closed");
            process::exit(exit_codes::SUCCESS);
        }
        Err(e) => {
            error!("{:#}", e);
            process::exit(exit_codes::RUNTIME_ERROR);
        }
    }
}

async fn run(
    args: &Args,
    session: Arc<SessionContext>,
    settings: HostSettings,
    settings_path: Option<PathBuf>,
) -> Result<()> {
    let mcp_config = session
        .write_mcp_config(&args.mcp_command)
        .context("Failed to write MCP client config")?;
    eprintln!(
        "parley channel: {}\nMCP client config: {}",
        session.root().display(),
        mcp_config.display()
    );

    let (_watcher, settings_updates) = match settings_path {
        Some(path) => match SettingsWatcher::spawn(&path, settings.clone()) {
            Ok((watcher, updates)) => (Some(watcher), Some(updates)),
            Err(e) => {
                warn!("Settings will not reload: {}", e);
                (None, None)
            }
        },
        None => (None, None),
    };

    let mode = match args.mode {
        Mode::Text => PanelMode::Text,
        Mode::Json => PanelMode::Json,
    };
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let output = terminal::spawn_output(command_rx, tokio::io::stdout(), mode);
    // Not awaited: a blocked stdin read must not hold up shutdown.
    terminal::spawn_input(BufReader::new(tokio::io::stdin()), event_tx, mode);

    let host = Host::new(session, Arc::new(command_tx), settings);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    host.run(cancel, event_rx, settings_updates)
        .await
        .context("Host runtime failed")?;

    drop(host);
    if let Err(e) = output.await {
        warn!("Panel output task failed: {}", e);
    }
    Ok(())
}
