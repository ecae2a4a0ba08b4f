//! # Candy Server
//!
//! Mutual TLS vending server.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Server Startup                                   │
//! │                                                                         │
//! │ tracing ─► CandyConfig::load_server ─► CredentialSet::load ─► processor │
//! │                                                               │         │
//! │                      ctrl-c / SIGTERM ◄── VendingServer::start          │
//! │                             │                                           │
//! │                             ▼                                           │
//! │                      ServerHandle::shutdown                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any credential or configuration problem stops the process before it binds.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use candy_core::pleasantry::CowSay;
use candy_core::TransactionProcessor;
use candy_net::{CandyConfig, CredentialSet, VendingServer};

/// Mutual TLS candy vending server.
#[derive(Debug, Parser)]
#[command(name = "candy-server", version)]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();

    info!("Starting candy server...");

    let settings =
        CandyConfig::load_server(args.config).context("Failed to load configuration")?;
    info!(
        addr = %settings.bind_address(),
        ca_cert = %settings.credentials.ca_cert.display(),
        cert = %settings.credentials.cert.display(),
        "Configuration loaded"
    );

    let credentials = CredentialSet::load(&settings.credentials)
        .context("Failed to load server credentials")?;
    info!(
        authorities = credentials.authority_count(),
        "Credentials loaded"
    );

    let processor = TransactionProcessor::new(settings.prices.clone(), Arc::new(CowSay));

    let handle = VendingServer::new(settings, Arc::new(credentials), processor)
        .start()
        .await
        .context("Failed to start vending server")?;
    info!(addr = %handle.local_addr(), "Ready for orders");

    shutdown_signal().await;
    handle.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
