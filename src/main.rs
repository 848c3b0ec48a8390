use std::path::PathBuf;

use anyhow::{bail, Context};
use attendanced::{
    backup,
    config::Config,
    start_server,
    state::{AppState, Backend},
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "attendanced", version)]
#[command(about = "Class attendance service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Snapshot or restore the attendance document.
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand, Debug)]
enum BackupAction {
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    Import {
        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = Config::load().context("environment misconfigured")?;

    info!("Initializing state...");
    let state = AppState::new(config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => start_server(state).await,
        Command::Backup { action } => {
            let store = match &state.backend {
                Backend::Ready(store) => store,
                Backend::Unconfigured(e) => bail!("document store not configured: {e}"),
            };
            match action {
                BackupAction::Export { out } => {
                    let summary = backup::export_store(store, &out)?;
                    info!(
                        format = %summary.format,
                        dates = summary.date_count,
                        sha256 = %summary.sha256,
                        "snapshot written to {}",
                        out.to_string_lossy()
                    );
                }
                BackupAction::Import { input } => {
                    let summary = backup::import_store(store, &input)?;
                    info!(
                        format = %summary.format_detected,
                        dates = summary.date_count,
                        "snapshot restored from {}",
                        input.to_string_lossy()
                    );
                }
            }
            Ok(())
        }
    }
}
