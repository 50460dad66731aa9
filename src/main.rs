//! Command-line front end for wgbridge.
//!
//! Wires the lifecycle manager to the real platform collaborators and exposes
//! the textual boundary surface: `SUCCESS:`/`ERROR:` lines for start and
//! stop, `CONNECTED`/`DISCONNECTED` for status. Operation failures are
//! reported on stdout and through the exit code; they never abort the
//! process.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use wgbridge::logging;
use wgbridge::platform::{CommandAddressing, DriverProbe};
use wgbridge::tunnel::TunnelManager;

#[derive(Parser)]
#[command(name = "wgbridge", version, about = "Drive a WireGuard-style tunnel engine from a config file")]
struct Cli {
    /// Name for the created virtual interface
    #[arg(long, default_value = "myvpn0")]
    interface: String,

    /// Userspace engine program to launch
    #[arg(long, default_value = "wireguard-go")]
    engine: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the tunnel described by a configuration file
    Start { config: PathBuf },
    /// Stop the tunnel started from a configuration file
    Stop { config: PathBuf },
    /// Report whether a tunnel is active for a configuration file
    Status { config: PathBuf },
}

#[cfg(unix)]
fn build_manager(cli: &Cli) -> TunnelManager {
    use wgbridge::platform::engine::{UapiEngineFactory, UserspaceWgFactory};

    TunnelManager::new(
        Arc::new(DriverProbe::well_known()),
        Arc::new(UserspaceWgFactory::new(cli.engine.clone())),
        Arc::new(UapiEngineFactory::new()),
        Arc::new(CommandAddressing::new()),
    )
    .with_interface_name(cli.interface.clone())
}

#[cfg(not(unix))]
fn build_manager(_cli: &Cli) -> TunnelManager {
    // Keep the probe and addressing paths; an engine integration for this
    // platform has to be supplied by the embedding application.
    unimplemented!("no built-in engine integration for this platform");
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_default_logging();

    let cli = Cli::parse();
    let manager = build_manager(&cli);

    let (line, ok) = match &cli.command {
        Command::Start { config } => match manager.start(config).await {
            Ok(()) => ("SUCCESS: tunnel connection established".to_string(), true),
            Err(e) => (format!("ERROR: {}", e), false),
        },
        Command::Stop { config } => match manager.stop(config).await {
            Ok(report) => {
                for warning in &report.warnings {
                    debug!(%warning, "stop cleanup warning");
                }
                ("SUCCESS: tunnel connection stopped".to_string(), true)
            }
            Err(e) => (format!("ERROR: {}", e), false),
        },
        Command::Status { config } => (manager.status(config).to_string(), true),
    };

    println!("{}", line);
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
