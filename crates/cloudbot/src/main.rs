mod console;
mod dispatch;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cloudbot_cloud_hetzner::{HetznerConfig, HetznerProvider};
use cloudbot_core::{Orchestrator, ReplySink};
use dispatch::{Command, Dispatcher};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudbot")]
#[command(about = "Chat-driven operator console for a small cloud fleet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read chat commands from stdin (default)
    Serve,
    /// Show servers and snapshots
    Status,
    /// Create a server from its latest snapshot
    Start {
        /// Server name
        server: String,
    },
    /// Shut down, snapshot and delete a server
    Stop {
        /// Server name
        server: String,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Version needs no configuration
    if matches!(cli.command, Some(Commands::Version)) {
        println!("cloudbot {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // stdout is the reply channel, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = cloudbot_config::load_settings().context("failed to load configuration")?;
    tracing::debug!("Loaded {:?}", settings);

    let provider = HetznerProvider::new(
        HetznerConfig::new(settings.hcloud_token.clone()).with_base_url(&settings.api_base_url),
    )
    .context("failed to set up the Hetzner client")?;
    let orchestrator = Orchestrator::from_settings(Arc::new(provider), &settings);

    let sink: Arc<dyn ReplySink> = Arc::new(console::ConsoleSink::new());
    let dispatcher = Dispatcher::new(orchestrator, sink);

    match cli.command {
        None | Some(Commands::Serve) => console::serve(&dispatcher).await?,
        Some(Commands::Status) => dispatcher.run(Command::Status).await,
        Some(Commands::Start { server }) => dispatcher.run(Command::Start(server)).await,
        Some(Commands::Stop { server }) => dispatcher.run(Command::Stop(server)).await,
        Some(Commands::Version) => unreachable!("Version is handled before config loading"),
    }

    Ok(())
}
