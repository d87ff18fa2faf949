use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::warn;

use rmp_rag::cli::commands::{handle_config, handle_provision, handle_setup, handle_stats};
use rmp_rag::cli::{Cli, Commands};
use rmp_rag::models::OutputFormat;
use rmp_rag::utils::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let format = cli.format.unwrap_or_default();
    let verbose = cli.verbose;

    tokio::select! {
        result = run_command(cli.command, format, verbose) => {
            result?;
        }
        _ = shutdown_signal() => {
            warn!("received shutdown signal, aborting");
            anyhow::bail!("interrupted");
        }
    }

    Ok(())
}

async fn run_command(command: Commands, format: OutputFormat, verbose: bool) -> Result<()> {
    match command {
        Commands::Setup(args) => {
            handle_setup(args, format, verbose).await?;
        }
        Commands::Provision(args) => {
            handle_provision(args, format, verbose).await?;
        }
        Commands::Stats(args) => {
            handle_stats(args, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, format, verbose).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
