use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, StoreBackend};
use crate::services::create_backend;

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[arg(long, help = "Index name")]
    pub index: Option<String>,

    #[arg(long, help = "Index backend: pinecone or qdrant")]
    pub store: Option<StoreBackend>,
}

pub async fn handle_stats(args: StatsArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(index) = args.index {
        config.index.name = index;
    }
    if let Some(backend) = args.store {
        config.index.backend = backend;
    }

    let store = create_backend(&config.index).context("failed to configure index backend")?;
    let stats = store
        .describe_index_stats(&config.index.name)
        .await
        .with_context(|| format!("failed to fetch stats for index '{}'", config.index.name))?;

    print!(
        "{}",
        get_formatter(format).format_index_stats(&config.index.name, &stats)
    );
    Ok(())
}
