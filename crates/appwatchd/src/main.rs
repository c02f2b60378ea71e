//! appwatchd — the appwatch daemon.
//!
//! Single binary that assembles:
//! - The shared Prometheus registry
//! - One watcher per application in the inventory
//! - The HTTP API (inventory sync, container metric delivery, `/metrics`)
//!
//! # Usage
//!
//! ```text
//! appwatchd run --config /etc/appwatch/appwatch.toml
//! appwatchd check --config appwatch.toml
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use prometheus::Registry;
use tracing::{error, info};

use appwatch_watcher::WatcherPool;

use crate::config::DaemonConfig;

#[derive(Parser)]
#[command(name = "appwatchd", about = "Per-application instance metrics watcher", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the configured applications and serve their metrics.
    Run {
        /// Path to appwatch.toml.
        #[arg(long, default_value = "appwatch.toml")]
        config: PathBuf,

        /// Override the configured listen address.
        #[arg(long)]
        listen: Option<String>,
    },
    /// Validate a configuration file and exit.
    Check {
        /// Path to appwatch.toml.
        #[arg(long, default_value = "appwatch.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,appwatch=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, listen } => run(config, listen).await,
        Command::Check { config } => {
            let cfg = DaemonConfig::from_file(&config)?;
            info!(apps = cfg.apps.len(), listen = %cfg.listen, "configuration ok");
            Ok(())
        }
    }
}

async fn run(config_path: PathBuf, listen: Option<String>) -> anyhow::Result<()> {
    let mut cfg = DaemonConfig::from_file(&config_path)?;
    if let Some(listen) = listen {
        cfg.listen = listen;
        cfg.validate()?;
    }
    info!(path = ?config_path, apps = cfg.apps.len(), "configuration loaded");

    // ── Initialize subsystems ──────────────────────────────────

    let registry = Registry::new();
    let pool = Arc::new(WatcherPool::new(
        Arc::new(registry.clone()),
        cfg.watcher_config(),
    ));

    let summary = pool.sync(cfg.apps.clone()).await;
    info!(started = summary.started, "watchers started");

    // ── Start API server ───────────────────────────────────────

    let router = appwatch_api::build_router(pool.clone(), registry);
    let addr = cfg.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    // Unregister everything before exit.
    pool.close_all().await;

    info!("appwatchd stopped");
    Ok(())
}
