use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, StoreBackend};
use crate::services::{ReadyWait, create_backend, ensure_index};

#[derive(Debug, Args)]
pub struct ProvisionArgs {
    #[arg(long, help = "Index name")]
    pub index: Option<String>,

    #[arg(long, help = "Index backend: pinecone or qdrant")]
    pub store: Option<StoreBackend>,
}

pub async fn handle_provision(
    args: ProvisionArgs,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(index) = args.index {
        config.index.name = index;
    }
    if let Some(backend) = args.store {
        config.index.backend = backend;
    }
    config.validate().context("invalid configuration")?;

    let store = create_backend(&config.index).context("failed to configure index backend")?;
    let descriptor = config.index.descriptor();
    let outcome = ensure_index(store.as_ref(), &descriptor, &ReadyWait::from(&config.index))
        .await
        .context("provisioning failed")?;

    print!(
        "{}",
        get_formatter(format).format_provision(&descriptor.name, outcome)
    );
    Ok(())
}
