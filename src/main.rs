//! Task tree server
//!
//! HTTP backend for parent/child task trees with ancestor completion
//! propagation.

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Duration;
use tasktree::cli::check::run_check;
use tasktree::cli::{Cli, Command};
use tasktree::config::{Config, ConfigLoader};
use tasktree::db::Database;
use tasktree::server::{AppState, spawn_session_reaper, start_server};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// How often expired sessions are purged.
const SESSION_REAP_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Install the global tracing subscriber according to `--log`.
///
/// `RUST_LOG` takes precedence over the `--verbose` default level.
fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    // SAFETY: set before any other threads read the environment
    if let Some(config_path) = &cli.config {
        unsafe {
            std::env::set_var("TASKTREE_CONFIG_PATH", config_path);
        }
    }
    let mut loader = ConfigLoader::load()?;
    if let Some(path) = loader.config_path() {
        info!("Config file: {}", path.display());
    }

    // CLI flags override every config tier
    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = loader.into_config();

    match cli.command {
        Some(Command::Check(args)) => run_check(&config.server.db_path, &args),
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Run the HTTP server until Ctrl-C.
async fn run_server(config: Config) -> Result<()> {
    config.ensure_db_dir()?;
    let addr = config.listen_addr()?;

    info!("Starting tasktree v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.server.db_path);

    let db = Arc::new(Database::open(&config.server.db_path)?);
    info!("Database initialized successfully");

    let reaper = spawn_session_reaper(Arc::clone(&db), SESSION_REAP_PERIOD);
    let state = AppState::new(db, &config.session);
    let (shutdown_tx, _bound, server) = start_server(state, addr).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    let _ = shutdown_tx.send(());
    server.await?;
    reaper.abort();

    Ok(())
}
